use crate::error::Res;
use crate::model::Money;
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// One row of the summary document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SummaryRow {
    project: String,
    total: Money,
}

impl SummaryRow {
    pub fn new(project: impl Into<String>, total: Money) -> Self {
        Self {
            project: project.into(),
            total,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn total(&self) -> Money {
        self.total
    }
}

/// The cross-project summary: the latest total cost of each project, one row per project.
///
/// Rows are kept in the order they were last reconciled; a project whose total is updated moves
/// to the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Summary(Vec<SummaryRow>);

impl Summary {
    /// Builds a summary from rows as read from a document. If the document somehow holds more
    /// than one row for a project, the last one wins, which restores the one-row-per-project
    /// invariant on the next write.
    pub fn from_rows(rows: impl IntoIterator<Item = SummaryRow>) -> Self {
        let mut summary = Self::default();
        for row in rows {
            summary.reconcile(row.project, row.total);
        }
        summary
    }

    /// Records `total` as the latest total of `project`: any existing row for the project is
    /// removed, then the new row is appended.
    pub fn reconcile(&mut self, project: impl Into<String>, total: Money) {
        let project = project.into();
        self.0.retain(|row| row.project != project);
        self.0.push(SummaryRow { project, total });
    }

    /// Removes the row for `project`. Returns `true` if there was one.
    pub fn remove(&mut self, project: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|row| row.project != project);
        self.0.len() != before
    }

    pub fn get(&self, project: &str) -> Option<Money> {
        self.0.iter().find(|r| r.project == project).map(|r| r.total)
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum over all projects.
    pub fn total(&self) -> Res<Money> {
        Money::checked_sum(self.0.iter().map(|r| r.total))
            .context("The total of all projects is too large")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    #[test]
    fn test_reconcile_replaces_existing_row() {
        let mut summary = Summary::default();
        summary.reconcile("X", money("100"));
        summary.reconcile("X", money("250"));
        assert_eq!(summary.rows(), &[SummaryRow::new("X", money("250"))]);
    }

    #[test]
    fn test_reconcile_keeps_other_projects() {
        let mut summary = Summary::default();
        summary.reconcile("A", money("1"));
        summary.reconcile("B", money("2"));
        summary.reconcile("C", money("3"));
        summary.reconcile("B", money("20"));
        let names: Vec<&str> = summary.rows().iter().map(|r| r.project()).collect();
        assert_eq!(names, vec!["A", "C", "B"]);
        assert_eq!(summary.get("B"), Some(money("20")));
        assert_eq!(summary.total().unwrap(), money("24"));
    }

    #[test]
    fn test_from_rows_collapses_duplicates() {
        let summary = Summary::from_rows(vec![
            SummaryRow::new("X", money("1")),
            SummaryRow::new("Y", money("2")),
            SummaryRow::new("X", money("3")),
        ]);
        assert_eq!(summary.rows().len(), 2);
        assert_eq!(summary.get("X"), Some(money("3")));
    }

    #[test]
    fn test_remove() {
        let mut summary = Summary::default();
        summary.reconcile("X", money("1"));
        assert!(summary.remove("X"));
        assert!(!summary.remove("X"));
        assert!(summary.is_empty());
    }
}
