//! Implements the `Mailer` trait with an SMTP relay over implicit TLS.

use super::Mailer;
use crate::error::Res;
use anyhow::Context;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::trace;

pub(crate) struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Connects lazily: nothing is sent over the network until the first message.
    pub(crate) fn new(host: &str, port: u16, username: &str, password: &str) -> Res<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .with_context(|| format!("Unable to set up the SMTP relay '{host}'"))?
            .port(port)
            .credentials(Credentials::new(
                username.to_string(),
                password.to_string(),
            ))
            .build();
        Ok(Self { transport })
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&mut self, message: Message) -> Res<()> {
        let response = self
            .transport
            .send(message)
            .await
            .context("The SMTP relay refused the message")?;
        trace!("SMTP response code {}", response.code());
        Ok(())
    }
}
