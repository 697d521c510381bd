//! Types that represent the core data model, such as `LineItem`, `Ledger` and `Summary`.
mod item;
mod ledger;
mod money;
mod project;
mod summary;

pub use item::{Items, LineItem};
pub use ledger::Ledger;
pub use money::{significant_digits, Money, MoneyError, SIGNIFICANT_DIGITS};
pub(crate) use project::format_date;
pub use project::{parse_date, Participant, ProjectInfo, ProjectName};
pub use summary::{Summary, SummaryRow};
