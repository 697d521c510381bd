//! tally keeps the costs of projects in spreadsheet workbooks.
//!
//! Each project has its own document with its line items, the totals per category and a bar chart
//! of those totals, plus the project information once it is saved. A summary document holds the
//! latest total cost of every project, one row each. Participants can be notified by email when a
//! project is opened.

mod backup;
mod config;
mod error;
mod notify;
mod utils;
mod workbook;

pub mod args;
pub mod commands;
pub mod model;

#[cfg(test)]
mod test;

pub use config::{Config, Labels};
pub use error::{Error, ErrorType, FileInUse, Result};
pub use notify::{FailedRecipient, Mode, NotifyReport, TEST_MODE_VAR};
