use crate::error::Res;
use crate::model::{LineItem, Money};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Totals per category, where the category is the item description.
///
/// A `Ledger` has no state of its own. It is always rebuilt from the items it summarizes, so it
/// can never drift from them. Iteration is ordered by description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger(BTreeMap<String, Money>);

impl Ledger {
    /// Sums the item totals per description. It is an error if a category total overflows.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a LineItem>) -> Res<Self> {
        let mut totals: BTreeMap<String, Money> = BTreeMap::new();
        for item in items {
            let total = totals.entry(item.description().to_string()).or_default();
            *total = total
                .checked_add(item.total())
                .with_context(|| format!("The total of '{}' is too large", item.description()))?;
        }
        Ok(Self(totals))
    }

    pub fn get(&self, category: &str) -> Option<Money> {
        self.0.get(category).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Money)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The sum of all category totals, which is also the project's total cost.
    pub fn grand_total(&self) -> Res<Money> {
        Money::checked_sum(self.0.values().copied()).context("The total cost is too large")
    }
}
