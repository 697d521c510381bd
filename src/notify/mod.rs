//! Emails the participants of a project when it is opened.
//!
//! Messages are sent one at a time through a `Mailer`. A participant whose address is invalid, or
//! whose message the relay refuses, is recorded in the `NotifyReport` and the batch carries on.

mod smtp;
mod test_mailer;

pub(crate) use smtp::SmtpMailer;
pub(crate) use test_mailer::TestMailer;

use crate::error::Res;
use crate::model::{format_date, ProjectInfo, ProjectName};
use crate::Config;
use anyhow::{anyhow, Context};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Address, Message};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// When this environment variable is set and non-empty, messages are not sent through SMTP.
pub const TEST_MODE_VAR: &str = "TALLY_IN_TEST_MODE";

/// Sends one email.
#[async_trait::async_trait]
pub(crate) trait Mailer: Send {
    async fn send(&mut self, message: Message) -> Res<()>;
}

/// Whether notifications go out over SMTP or stay in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Smtp,
    Test,
}

serde_plain::derive_display_from_serialize!(Mode);
serde_plain::derive_fromstr_from_deserialize!(Mode);

impl Mode {
    /// `Mode::Test` if `TALLY_IN_TEST_MODE` is set and non-empty, otherwise `Mode::Smtp`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_VAR) {
            Ok(v) if !v.is_empty() => Mode::Test,
            _ => Mode::Smtp,
        }
    }
}

/// Builds the mailer for `mode`. The SMTP mailer logs in as `sender` with `secret`, which must be
/// present.
pub(crate) fn mailer(
    config: &Config,
    mode: Mode,
    sender: &str,
    secret: Option<&str>,
) -> Res<Box<dyn Mailer>> {
    match mode {
        Mode::Test => {
            debug!("Test mode, messages will not leave this process");
            Ok(Box::new(TestMailer::default()))
        }
        Mode::Smtp => {
            let secret = secret
                .filter(|s| !s.is_empty())
                .context("The SMTP password is missing, set TALLY_SMTP_PASSWORD")?;
            Ok(Box::new(SmtpMailer::new(
                config.smtp_host(),
                config.smtp_port(),
                sender,
                secret,
            )?))
        }
    }
}

/// A participant who could not be notified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecipient {
    pub email: String,
    pub reason: String,
}

/// The outcome of notifying every participant of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyReport {
    /// Addresses that were sent a message.
    pub sent: Vec<String>,
    pub failed: Vec<FailedRecipient>,
}

impl NotifyReport {
    /// True when nobody failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// A report in which every participant failed for the same `reason`, used when messages could
    /// not be attempted at all.
    pub fn all_failed(info: &ProjectInfo, reason: impl std::fmt::Display) -> Self {
        let reason = format!("{reason:#}");
        Self {
            sent: Vec::new(),
            failed: info
                .participants()
                .iter()
                .map(|p| FailedRecipient {
                    email: p.email().to_string(),
                    reason: reason.clone(),
                })
                .collect(),
        }
    }

    fn fail(&mut self, email: &str, reason: anyhow::Error) {
        warn!("Unable to notify {email}: {reason:#}");
        self.failed.push(FailedRecipient {
            email: email.to_string(),
            reason: format!("{reason:#}"),
        });
    }
}

/// Sends every participant of `project` an email from the project manager. Never fails as a
/// whole: each failure is recorded in the returned report.
pub(crate) async fn notify_participants(
    mailer: &mut dyn Mailer,
    project: &ProjectName,
    info: &ProjectInfo,
    currency_symbol: &str,
) -> NotifyReport {
    let from = match mailbox(info.manager(), info.manager_email()) {
        Ok(from) => from,
        Err(e) => {
            return NotifyReport::all_failed(info, e.context("The manager email is not valid"))
        }
    };

    let mut report = NotifyReport::default();
    for participant in info.participants() {
        let email = participant.email();
        let text = body(project, participant.name(), info, currency_symbol);
        let message = match mailbox(participant.name(), email)
            .and_then(|to| compose(from.clone(), to, project, text))
        {
            Ok(message) => message,
            Err(e) => {
                report.fail(email, e);
                continue;
            }
        };
        match mailer.send(message).await {
            Ok(()) => {
                debug!("Notified {email}");
                report.sent.push(email.to_string());
            }
            Err(e) => report.fail(email, e),
        }
    }
    info!(
        "Notified {} of {} participants of '{project}'",
        report.sent.len(),
        info.participants().len()
    );
    report
}

fn mailbox(name: &str, email: &str) -> Res<Mailbox> {
    let address: Address = email
        .parse()
        .map_err(|e| anyhow!("'{email}' is not a valid email address: {e}"))?;
    Ok(Mailbox::new(Some(name.to_string()), address))
}

fn compose(from: Mailbox, to: Mailbox, project: &ProjectName, text: String) -> Res<Message> {
    Message::builder()
        .from(from)
        .to(to)
        .subject(subject(project))
        .header(ContentType::TEXT_PLAIN)
        .body(text)
        .context("Unable to build the email message")
}

fn subject(project: &ProjectName) -> String {
    format!("Project opened: {project}")
}

fn body(project: &ProjectName, participant: &str, info: &ProjectInfo, symbol: &str) -> String {
    format!(
        "Hello {participant},\n\n\
         You have been added as a participant of the project '{project}'.\n\n\
         Manager: {}\n\
         Opening date: {}\n\
         Estimated completion: {}\n\
         Estimated cost: {}\n\n\
         Regards,\n{}\n",
        info.manager(),
        format_date(info.opened()),
        format_date(info.estimated_completion()),
        info.estimated_cost().render(symbol),
        info.manager(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{parse_date, Money, Participant};
    use std::str::FromStr;

    fn info(participants: &[&str], manager_email: &str) -> ProjectInfo {
        ProjectInfo::new(
            "Maria Lima",
            manager_email,
            parse_date("2025-03-01").unwrap(),
            parse_date("2025-09-30").unwrap(),
            Money::from_str("12500").unwrap(),
            participants
                .iter()
                .map(|p| Participant::from_str(p).unwrap())
                .collect(),
        )
        .unwrap()
    }

    fn project() -> ProjectName {
        ProjectName::new("House").unwrap()
    }

    #[tokio::test]
    async fn test_invalid_address_does_not_stop_the_batch() {
        let info = info(
            &[
                "Ana,ana@example.com",
                "Bo,not-an-address",
                "Cy,cy@example.com",
            ],
            "maria@example.com",
        );
        let mut mailer = TestMailer::default();
        let report = notify_participants(&mut mailer, &project(), &info, "$").await;

        assert_eq!(report.sent, vec!["ana@example.com", "cy@example.com"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].email, "not-an-address");
        assert!(!report.is_complete());
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_refused_recipient_is_reported() {
        let info = info(
            &["Ana,ana@example.com", "Bo,bo@example.com"],
            "maria@example.com",
        );
        let mut mailer = TestMailer::default().reject("bo@example.com");
        let report = notify_participants(&mut mailer, &project(), &info, "$").await;
        assert_eq!(report.sent, vec!["ana@example.com"]);
        assert_eq!(report.failed[0].email, "bo@example.com");
        assert!(report.failed[0].reason.contains("refused"));
    }

    #[tokio::test]
    async fn test_message_content() {
        let info = info(&["Ana,ana@example.com"], "maria@example.com");
        let mut mailer = TestMailer::default();
        let report = notify_participants(&mut mailer, &project(), &info, "$").await;
        assert!(report.is_complete());

        let raw = String::from_utf8(mailer.sent()[0].formatted()).unwrap();
        assert!(raw.contains("Subject: Project opened: House"));
        assert!(raw.contains("Hello Ana"));
        assert!(raw.contains("2025-09-30"));
        assert!(raw.contains("$12,500.00"));
    }

    #[tokio::test]
    async fn test_invalid_manager_email_fails_everyone() {
        let info = info(&["Ana,ana@example.com", "Bo,bo@example.com"], "maria");
        let mut mailer = TestMailer::default();
        let report = notify_participants(&mut mailer, &project(), &info, "$").await;
        assert!(report.sent.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_smtp_mailer_requires_a_secret() {
        let env = crate::test::TestEnv::new().await;
        let config = env.config();
        assert!(mailer(&config, Mode::Smtp, "maria@example.com", None).is_err());
        assert!(mailer(&config, Mode::Smtp, "maria@example.com", Some("")).is_err());
        assert!(mailer(&config, Mode::Test, "maria@example.com", None).is_ok());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Smtp.to_string(), "smtp");
        assert_eq!(Mode::from_str("test").unwrap(), Mode::Test);
    }
}
