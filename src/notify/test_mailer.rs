//! Implements the `Mailer` trait in memory.
//!
//! Note: this is compiled even in the "production" version of this app so that the whole app can
//! run top-to-bottom with `TALLY_IN_TEST_MODE` set and without an SMTP relay.

use super::Mailer;
use crate::error::Res;
use anyhow::bail;
use lettre::Message;
use std::collections::HashSet;
use tracing::info;

/// Keeps every message it is given. Addresses added with `reject` are refused, as a relay would
/// refuse an unknown mailbox.
#[derive(Debug, Default)]
pub(crate) struct TestMailer {
    sent: Vec<Message>,
    rejected: HashSet<String>,
}

impl TestMailer {
    #[cfg(test)]
    pub(crate) fn reject(mut self, email: &str) -> Self {
        self.rejected.insert(email.to_lowercase());
        self
    }

    #[cfg(test)]
    pub(crate) fn sent(&self) -> &[Message] {
        &self.sent
    }
}

#[async_trait::async_trait]
impl Mailer for TestMailer {
    async fn send(&mut self, message: Message) -> Res<()> {
        for to in message.envelope().to() {
            if self.rejected.contains(&to.to_string().to_lowercase()) {
                bail!("The relay refused the recipient {to}")
            }
        }
        info!(
            "Test mode, not sending the message to {}",
            message
                .envelope()
                .to()
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.sent.push(message);
        Ok(())
    }
}
