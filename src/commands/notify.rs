use crate::commands::{existing_project, plural, project_name, Out};
use crate::error::{ErrorType, IntoResult};
use crate::notify::{mailer, notify_participants, Mode, NotifyReport};
use crate::workbook::Store;
use crate::{Config, Result};
use anyhow::anyhow;

/// Emails the participants of a project that has saved information.
///
/// # Errors
///
/// - Returns a `NotFound` error if the project does not exist.
/// - Returns a `Validation` error if the project has no information saved yet.
/// - Returns a `Notification` error if no message could be attempted, e.g. the SMTP password is
///   missing.
///
/// Failures for individual participants are not errors: they are listed in the report.
pub async fn notify(
    config: Config,
    mode: Mode,
    project: &str,
    smtp_password: Option<&str>,
) -> Result<Out<NotifyReport>> {
    let name = project_name(project)?;
    let store = Store::new(config);
    let doc = existing_project(&store, &name).await?;
    let Some(info) = doc.info() else {
        return Err(anyhow!(
            "Project '{name}' has no information yet, run 'tally project new' first"
        ))
        .pub_result(ErrorType::Validation);
    };

    let mut mailer = mailer(store.config(), mode, info.manager_email(), smtp_password)
        .pub_result(ErrorType::Notification)?;
    let report = notify_participants(
        mailer.as_mut(),
        &name,
        info,
        store.config().currency_symbol(),
    )
    .await;

    let mut message = format!(
        "Notified {} of {} participant{} of '{name}'",
        report.sent.len(),
        info.participants().len(),
        plural(info.participants().len())
    );
    for failed in &report.failed {
        message.push_str(&format!(
            "\n  Could not notify {}: {}",
            failed.email, failed.reason
        ));
    }
    Ok(Out::new(message, report))
}
