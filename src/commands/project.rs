//! Project command handlers.

use crate::args::ProjectNewArgs;
use crate::commands::{existing_project, plural, project_name, save_and_reconcile, Out, Saved};
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::{parse_date, Items, Ledger, Money, Participant, ProjectInfo, ProjectName};
use crate::notify::{mailer, notify_participants, Mode, NotifyReport};
use crate::workbook::Store;
use crate::{Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::str::FromStr;
use tracing::warn;

/// Saves the information of a project, keeping its items if the project already exists, and then
/// reconciles the summary. With `--notify`, the participants are emailed after everything is
/// saved.
///
/// # Errors
///
/// - Returns a `Validation` error if any field is malformed, e.g. a bad date or a duplicate
///   participant email.
/// - Returns a `FileInUse` error if the project document or the summary is open in another
///   program.
///
/// Notification failures are not errors: they are reported in the output.
pub async fn project_new(
    config: Config,
    mode: Mode,
    args: &ProjectNewArgs,
    smtp_password: Option<&str>,
) -> Result<Out<Saved>> {
    let name = project_name(args.name())?;
    let info = project_info(args).pub_result(ErrorType::Validation)?;
    let store = Store::new(config);

    let mut doc = store
        .load_or_new_project(&name)
        .await
        .pub_result(ErrorType::Io)?;
    doc.set_info(info.clone());
    let mut saved = save_and_reconcile(&store, &name, &doc).await?;

    if args.notify() {
        let report = match mailer(store.config(), mode, info.manager_email(), smtp_password) {
            Ok(mut mailer) => {
                notify_participants(
                    mailer.as_mut(),
                    &name,
                    &info,
                    store.config().currency_symbol(),
                )
                .await
            }
            Err(e) => {
                warn!("The project was saved but notifications could not be sent: {e:#}");
                NotifyReport::all_failed(&info, e)
            }
        };
        saved.notifications = Some(report);
    }
    let message = saved.message(store.config().currency_symbol());
    Ok(Out::new(message, saved))
}

fn project_info(args: &ProjectNewArgs) -> Res<ProjectInfo> {
    let opened = parse_date(args.opened()).context("Invalid opening date")?;
    let completion = parse_date(args.completion()).context("Invalid completion date")?;
    let cost = Money::from_str(args.estimated_cost()).context("Invalid estimated cost")?;
    let participants = args
        .participants()
        .iter()
        .map(|p| Participant::from_str(p))
        .collect::<Res<Vec<_>>>()?;
    ProjectInfo::new(
        args.manager(),
        args.manager_email(),
        opened,
        completion,
        cost,
        participants,
    )
}

/// Lists the projects that have a document in the tally home directory.
pub async fn project_list(config: Config) -> Result<Out<Vec<ProjectName>>> {
    let names = Store::new(config)
        .list_projects()
        .await
        .pub_result(ErrorType::Io)?;
    let mut message = format!("Found {} project{}", names.len(), plural(names.len()));
    for name in &names {
        message.push_str(&format!("\n  {name}"));
    }
    Ok(Out::new(message, names))
}

/// Everything known about one project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectReport {
    pub project: ProjectName,
    pub items: Items,
    pub ledger: Ledger,
    pub total: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ProjectInfo>,
}

/// Shows the items, category totals and information of a project.
pub async fn project_show(config: Config, name: &str) -> Result<Out<ProjectReport>> {
    let name = project_name(name)?;
    let symbol = config.currency_symbol().to_string();
    let store = Store::new(config);
    let doc = existing_project(&store, &name).await?;
    let ledger = doc.ledger().pub_result(ErrorType::Validation)?;
    let report = ProjectReport {
        project: name,
        items: doc.items().clone(),
        total: ledger.grand_total().pub_result(ErrorType::Validation)?,
        ledger,
        info: doc.info().cloned(),
    };
    let message = render_report(&report, &symbol);
    Ok(Out::new(message, report))
}

fn render_report(report: &ProjectReport, symbol: &str) -> String {
    let mut s = format!("Project '{}'", report.project);
    if let Some(info) = &report.info {
        s.push_str(&format!(
            "\n  Manager: {} <{}>\n  Opened: {}, estimated completion: {}\n  Estimated cost: {}",
            info.manager(),
            info.manager_email(),
            info.opened(),
            info.estimated_completion(),
            info.estimated_cost().render(symbol)
        ));
        for p in info.participants() {
            s.push_str(&format!("\n  Participant: {} <{}>", p.name(), p.email()));
            if let Some(phone) = p.phone() {
                s.push_str(&format!(" {phone}"));
            }
        }
    }
    s.push_str("\nItems:");
    for (ix, item) in report.items.iter().enumerate() {
        s.push_str(&format!(
            "\n  {}. {} x {} {} at {} = {}",
            ix + 1,
            item.description(),
            item.quantity(),
            item.unit(),
            item.unit_price().render(symbol),
            item.total().render(symbol)
        ));
    }
    s.push_str("\nTotals by category:");
    for (category, total) in report.ledger.iter() {
        s.push_str(&format!("\n  {category}: {}", total.render(symbol)));
    }
    s.push_str(&format!("\nTotal: {}", report.total.render(symbol)));
    s
}

/// Deletes a project document and its summary row.
pub async fn project_delete(config: Config, name: &str) -> Result<Out<ProjectName>> {
    let name = project_name(name)?;
    let store = Store::new(config);
    if !store.project_exists(&name) {
        return Err(anyhow::anyhow!("There is no project named '{name}'"))
            .pub_result(ErrorType::NotFound);
    }
    store
        .delete_project(&name)
        .await
        .pub_result(ErrorType::Io)?;
    Ok(Out::new(format!("Deleted project '{name}'"), name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ItemAddArgs;
    use crate::commands::items_add;
    use crate::test::TestEnv;

    fn new_args(name: &str, participants: &[&str], notify: bool) -> ProjectNewArgs {
        ProjectNewArgs::new(
            name,
            "Maria Lima",
            "maria@example.com",
            "2025-03-01",
            "2025-09-30",
            "$12,500.00",
            participants.iter().map(|p| p.to_string()).collect(),
            notify,
        )
    }

    #[tokio::test]
    async fn test_project_new_and_show() {
        let env = TestEnv::new().await;
        let args = new_args("Beach House", &["Ana,ana@example.com,555"], false);
        let out = project_new(env.config(), Mode::Test, &args, None)
            .await
            .unwrap();
        let saved = out.structure().unwrap();
        assert_eq!(saved.project.as_str(), "Beach_House");
        assert!(saved.path.ends_with("project_Beach_House.xlsx"));
        assert!(saved.notifications.is_none());

        let out = project_show(env.config(), "Beach House").await.unwrap();
        let report = out.structure().unwrap();
        let info = report.info.as_ref().unwrap();
        assert_eq!(info.manager(), "Maria Lima");
        assert_eq!(info.participants()[0].phone(), Some("555"));
        assert!(report.items.is_empty());
        assert!(out.message().contains("Participant: Ana <ana@example.com> 555"));
    }

    #[tokio::test]
    async fn test_project_new_keeps_existing_items() {
        let env = TestEnv::new().await;
        items_add(
            env.config(),
            &ItemAddArgs::new("House", "Cement", "10", "bag", "25"),
        )
        .await
        .unwrap();
        project_new(env.config(), Mode::Test, &new_args("House", &[], false), None)
            .await
            .unwrap();

        let out = project_show(env.config(), "House").await.unwrap();
        let report = out.structure().unwrap();
        assert_eq!(report.items.len(), 1);
        assert!(report.info.is_some());
        assert_eq!(report.total, Money::from_str("250").unwrap());
    }

    #[tokio::test]
    async fn test_project_new_validation() {
        let env = TestEnv::new().await;
        let args = ProjectNewArgs::new(
            "House",
            "Maria Lima",
            "maria@example.com",
            "2025-09-30",
            "2025-03-01",
            "100",
            vec![],
            false,
        );
        let e = project_new(env.config(), Mode::Test, &args, None)
            .await
            .unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Validation);

        let args = new_args("a/b", &[], false);
        let e = project_new(env.config(), Mode::Test, &args, None)
            .await
            .unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Validation);

        let args = new_args(
            "House",
            &["Ana,ana@example.com", "Ana B,ANA@example.com"],
            false,
        );
        let e = project_new(env.config(), Mode::Test, &args, None)
            .await
            .unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Validation);
        assert!(!Store::new(env.config()).project_exists(&ProjectName::new("House").unwrap()));
    }

    #[tokio::test]
    async fn test_project_new_with_notify_reports_failures() {
        let env = TestEnv::new().await;
        let args = new_args(
            "House",
            &[
                "Ana,ana@example.com",
                "Bo,bo-at-example.com",
                "Cy,cy@example.com",
            ],
            true,
        );
        let out = project_new(env.config(), Mode::Test, &args, None)
            .await
            .unwrap();
        let report = out.structure().unwrap().notifications.as_ref().unwrap();
        assert_eq!(report.sent.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].email, "bo-at-example.com");
        assert!(out.message().contains("could not notify: bo-at-example.com"));
    }

    #[tokio::test]
    async fn test_missing_smtp_password_does_not_fail_the_save() {
        let env = TestEnv::new().await;
        let args = new_args("House", &["Ana,ana@example.com"], true);
        let out = project_new(env.config(), Mode::Smtp, &args, None)
            .await
            .unwrap();
        let report = out.structure().unwrap().notifications.as_ref().unwrap();
        assert!(report.sent.is_empty());
        assert!(report.failed[0].reason.contains("TALLY_SMTP_PASSWORD"));
        assert!(Store::new(env.config()).project_exists(&ProjectName::new("House").unwrap()));
    }

    #[tokio::test]
    async fn test_project_list_and_delete() {
        let env = TestEnv::new().await;
        for name in ["Shed", "Barn"] {
            project_new(env.config(), Mode::Test, &new_args(name, &[], false), None)
                .await
                .unwrap();
        }
        let out = project_list(env.config()).await.unwrap();
        let names: Vec<&str> = out.structure().unwrap().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["Barn", "Shed"]);

        project_delete(env.config(), "Shed").await.unwrap();
        let out = project_list(env.config()).await.unwrap();
        assert_eq!(out.structure().unwrap().len(), 1);

        let summary = Store::new(env.config()).load_summary().await.unwrap();
        assert_eq!(summary.get("Shed"), None);
        assert!(summary.get("Barn").is_some());

        let e = project_delete(env.config(), "Shed").await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_show_unknown_project() {
        let env = TestEnv::new().await;
        let e = project_show(env.config(), "Nope").await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::NotFound);
    }
}
