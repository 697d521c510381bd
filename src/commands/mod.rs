//! Command handlers for the tally CLI.
//!
//! This module contains implementations for all CLI subcommands. Every command that changes a
//! project saves the project document first and then reconciles the summary; notifications, when
//! asked for, come last and never undo or fail a save.

mod init;
mod items;
mod notify;
mod project;
mod summary;

use crate::error::{ErrorType, IntoResult};
use crate::model::{Ledger, Money, ProjectName};
use crate::notify::NotifyReport;
use crate::workbook::{ProjectDocument, Store};
use crate::Result;
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::fmt::Debug;
use std::path::PathBuf;
use tracing::{debug, info};

pub use init::init;
pub use items::{items_add, items_import, items_remove};
pub use notify::notify;
pub use project::{project_delete, project_list, project_new, project_show, ProjectReport};
pub use summary::summary;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// What a command that saved a project document returns.
#[derive(Debug, Clone, Serialize)]
pub struct Saved {
    pub project: ProjectName,
    pub path: PathBuf,
    pub ledger: Ledger,
    pub total: Money,
    /// Present only when notifications were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotifyReport>,
}

impl Saved {
    /// One line for the user. A notification report with failures names every failed address.
    fn message(&self, symbol: &str) -> String {
        let mut message = format!(
            "Saved project '{}' with a total cost of {}",
            self.project,
            self.total.render(symbol)
        );
        if let Some(report) = &self.notifications {
            message.push_str(&format!(
                ", notified {} participant{}",
                report.sent.len(),
                plural(report.sent.len())
            ));
            if !report.is_complete() {
                let failed: Vec<String> = report
                    .failed
                    .iter()
                    .map(|f| format!("{} ({})", f.email, f.reason))
                    .collect();
                message.push_str(&format!(", could not notify: {}", failed.join("; ")));
            }
        }
        message
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Validates a project name given on the command line.
fn project_name(name: &str) -> Result<ProjectName> {
    ProjectName::new(name).pub_result(ErrorType::Validation)
}

/// Loads a project that must already exist.
async fn existing_project(store: &Store, name: &ProjectName) -> Result<ProjectDocument> {
    if !store.project_exists(name) {
        return Err(anyhow!("There is no project named '{name}'")).pub_result(ErrorType::NotFound);
    }
    store.load_project(name).await.pub_result(ErrorType::Io)
}

/// Saves the project document, then records its total in the summary.
///
/// Totals are computed before anything is written, so an overflowing item set is a `Validation`
/// error that leaves both documents untouched. The two documents are written one after the other:
/// if the summary cannot be written, the project document has already been saved and the error
/// says so.
async fn save_and_reconcile(
    store: &Store,
    name: &ProjectName,
    doc: &ProjectDocument,
) -> Result<Saved> {
    let ledger = doc.ledger().pub_result(ErrorType::Validation)?;
    let total = ledger.grand_total().pub_result(ErrorType::Validation)?;
    let path = store.save_project(name, doc).await.pub_result(ErrorType::Io)?;
    store
        .record_total(name, total)
        .await
        .with_context(|| {
            format!(
                "Project '{name}' was saved to {} but the summary was not updated",
                path.display()
            )
        })
        .pub_result(ErrorType::Io)?;
    Ok(Saved {
        project: name.clone(),
        path,
        ledger,
        total,
        notifications: None,
    })
}
