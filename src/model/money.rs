//! Monetary values.
//!
//! `Money` wraps a `Decimal` so that totals add up exactly, and parses user input that may carry a
//! currency prefix (`$`, `R$`, `€`) and thousands separators.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// The most significant digits a spreadsheet number cell holds exactly.
pub const SIGNIFICANT_DIGITS: u32 = 15;

/// Counts the significant digits of a decimal, ignoring leading and trailing zeros.
///
/// ```
/// # use tally::model::significant_digits;
/// # use rust_decimal::Decimal;
/// # use std::str::FromStr;
/// assert_eq!(significant_digits(Decimal::from_str("0.0120").unwrap()), 2);
/// assert_eq!(significant_digits(Decimal::from_str("25000").unwrap()), 2);
/// ```
pub fn significant_digits(value: Decimal) -> u32 {
    let mut mantissa = value.normalize().mantissa().unsigned_abs();
    if mantissa == 0 {
        return 0;
    }
    while mantissa % 10 == 0 {
        mantissa /= 10;
    }
    mantissa.ilog10() + 1
}

/// A monetary amount in the (single, configured) currency of the books.
///
/// ```
/// # use tally::model::Money;
/// # use std::str::FromStr;
/// let price = Money::from_str("R$ 1,250.50").unwrap();
/// assert_eq!(price.to_string(), "1,250.50");
/// assert_eq!(price.render("$"), "$1,250.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// The value as a float, for writing into spreadsheet cells.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// `None` if the sum does not fit in a `Decimal`.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Price times quantity. `None` if the product does not fit in a `Decimal`.
    pub fn checked_mul(self, quantity: Decimal) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }

    /// Sums amounts, returning `None` on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |sum, amount| sum.checked_add(amount))
    }

    /// Formats with a currency symbol, e.g. `-$1,000.00`.
    pub fn render(&self, symbol: &str) -> String {
        let (sign, num) = if self.is_negative() {
            ("-", self.0.abs())
        } else {
            ("", self.0)
        };
        format!("{sign}{symbol}{}", Money(num))
    }
}

/// An error that can occur when parsing strings into `Money` values.
pub struct MoneyError {
    input: String,
    source: Option<rust_decimal::Error>,
}

impl Debug for MoneyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MoneyError({:?}, {:?})", self.input, self.source)
    }
}

impl Display for MoneyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid amount of money", self.input)
    }
}

impl std::error::Error for MoneyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |source| MoneyError {
            input: s.to_string(),
            source,
        };
        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };

        // Everything before the first digit or decimal point is treated as a currency prefix.
        let start = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .ok_or_else(|| err(None))?;
        let prefix = rest[..start].trim();
        if prefix.chars().any(|c| c.is_ascii_digit() || c == '-' || c == '+') {
            return Err(err(None));
        }

        let digits = rest[start..].replace(',', "");
        let value = Decimal::from_str(&digits).map_err(|e| err(Some(e)))?;
        Ok(Money(if negative { -value } else { value }))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-")?;
        }
        write!(
            f,
            "{}",
            format_num::format_num!(",.2", self.0.abs().to_f64().unwrap_or_default())
        )
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Money::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}
