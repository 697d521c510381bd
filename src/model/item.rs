use crate::error::Res;
use crate::model::{significant_digits, Money, SIGNIFICANT_DIGITS};
use anyhow::{bail, ensure};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

/// One billable line of a project: `quantity` units of something at `unit_price` each.
///
/// The description doubles as the category key for the ledger. It is whitespace-normalized on
/// construction (trimmed, inner runs collapsed to one space) but its case is kept and is
/// significant: `Cement` and `cement` are different categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LineItem {
    description: String,
    quantity: Decimal,
    unit: String,
    unit_price: Money,
}

impl LineItem {
    /// Validates and creates a line item.
    ///
    /// # Errors
    /// - the description is empty after trimming
    /// - the quantity is not greater than zero
    /// - the unit price is negative
    /// - the quantity or the unit price has more significant digits than a spreadsheet cell
    ///   holds exactly
    /// - the total does not fit in a `Decimal`
    pub fn new(
        description: impl AsRef<str>,
        quantity: Decimal,
        unit: impl AsRef<str>,
        unit_price: Money,
    ) -> Res<Self> {
        let description = normalize_description(description.as_ref());
        ensure!(!description.is_empty(), "The item description must not be empty");
        ensure!(
            quantity > Decimal::ZERO,
            "The quantity of '{description}' must be greater than zero, got {quantity}"
        );
        ensure!(
            !unit_price.is_negative(),
            "The unit price of '{description}' must not be negative, got {unit_price}"
        );
        ensure!(
            significant_digits(quantity) <= SIGNIFICANT_DIGITS,
            "The quantity of '{description}' has more than {SIGNIFICANT_DIGITS} significant \
            digits, got {quantity}"
        );
        ensure!(
            significant_digits(unit_price.value()) <= SIGNIFICANT_DIGITS,
            "The unit price of '{description}' has more than {SIGNIFICANT_DIGITS} significant \
            digits, got {}",
            unit_price.value()
        );
        ensure!(
            unit_price.checked_mul(quantity).is_some(),
            "The total of '{description}' is too large, {quantity} x {} overflows",
            unit_price.value()
        );
        Ok(Self {
            description,
            quantity,
            unit: unit.as_ref().trim().to_string(),
            unit_price,
        })
    }

    /// Parses the quantity and unit price from user-entered text before validating.
    pub fn parse(description: &str, quantity: &str, unit: &str, unit_price: &str) -> Res<Self> {
        let quantity = match Decimal::from_str(quantity.trim().replace(',', "").as_str()) {
            Ok(q) => q,
            Err(_) => bail!("'{quantity}' is not a valid quantity"),
        };
        let unit_price = Money::from_str(unit_price)?;
        Self::new(description, quantity, unit, unit_price)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// `quantity × unit_price`. Always computed, never stored.
    pub fn total(&self) -> Money {
        // `new` rejects items whose product overflows.
        self.unit_price
            .checked_mul(self.quantity)
            .unwrap_or_default()
    }
}

/// The ordered item list of one project, in entry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Items(Vec<LineItem>);

impl Items {
    pub fn new(items: Vec<LineItem>) -> Self {
        Self(items)
    }

    pub fn push(&mut self, item: LineItem) {
        self.0.push(item);
    }

    /// Removes the item at a 1-based `position`, as shown to the user.
    pub fn remove(&mut self, position: usize) -> Res<LineItem> {
        if position == 0 || position > self.0.len() {
            bail!(
                "There is no item at position {position}, the project has {} item{}",
                self.0.len(),
                if self.0.len() == 1 { "" } else { "s" }
            )
        }
        Ok(self.0.remove(position - 1))
    }

    pub fn data(&self) -> &[LineItem] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.0.iter()
    }
}

impl FromIterator<LineItem> for Items {
    fn from_iter<T: IntoIterator<Item = LineItem>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn normalize_description(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
