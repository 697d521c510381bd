use crate::error::Res;
use crate::model::{significant_digits, Money, SIGNIFICANT_DIGITS};
use anyhow::{bail, ensure, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";
const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// The identifier of a project: the entered name, trimmed, with each run of whitespace replaced by
/// an underscore. It names the project's document on disk and keys its summary row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    pub fn new(name: impl AsRef<str>) -> Res<Self> {
        let normalized = name.as_ref().split_whitespace().collect::<Vec<_>>().join("_");
        ensure!(!normalized.is_empty(), "The project name must not be empty");
        if let Some(bad) = normalized.chars().find(|c| FORBIDDEN.contains(c) || c.is_control()) {
            bail!("The project name '{normalized}' contains the character '{bad}' which is not allowed")
        }
        ensure!(
            normalized != "." && normalized != "..",
            "'{normalized}' is not a valid project name"
        );
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ProjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for ProjectName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for ProjectName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Res<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ProjectName {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Res<Self> {
        Self::new(value)
    }
}

impl From<ProjectName> for String {
    fn from(value: ProjectName) -> Self {
        value.0
    }
}

/// Someone taking part in a project, who gets notified when it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    name: String,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
}

impl Participant {
    pub fn new(name: impl AsRef<str>, email: impl AsRef<str>, phone: Option<&str>) -> Res<Self> {
        let name = name.as_ref().trim().to_string();
        let email = email.as_ref().trim().to_string();
        ensure!(!name.is_empty(), "A participant name must not be empty");
        ensure!(!email.is_empty(), "The email of participant '{name}' must not be empty");
        let phone = phone.map(str::trim).filter(|p| !p.is_empty()).map(String::from);
        Ok(Self { name, email, phone })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
}

/// Parses `Name,email[,phone]` as given on the command line.
impl FromStr for Participant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Res<Self> {
        let parts: Vec<&str> = s.split(',').collect();
        match parts.as_slice() {
            [name, email] => Self::new(name, email, None),
            [name, email, phone] => Self::new(name, email, Some(*phone)),
            _ => bail!("Expected a participant as 'Name,email' or 'Name,email,phone', got '{s}'"),
        }
    }
}

/// The descriptive part of a project, saved to the information sheet of its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProjectInfo {
    manager: String,
    manager_email: String,
    opened: NaiveDate,
    estimated_completion: NaiveDate,
    estimated_cost: Money,
    participants: Vec<Participant>,
}

impl ProjectInfo {
    /// Validates and creates the project information.
    ///
    /// # Errors
    /// - the manager name or email is empty
    /// - the estimated completion is before the opening date
    /// - the estimated cost is negative or has more significant digits than a spreadsheet cell
    ///   holds exactly
    /// - two participants share an email address (compared case-insensitively)
    pub fn new(
        manager: impl AsRef<str>,
        manager_email: impl AsRef<str>,
        opened: NaiveDate,
        estimated_completion: NaiveDate,
        estimated_cost: Money,
        participants: Vec<Participant>,
    ) -> Res<Self> {
        let manager = manager.as_ref().trim().to_string();
        let manager_email = manager_email.as_ref().trim().to_string();
        ensure!(!manager.is_empty(), "The manager name must not be empty");
        ensure!(!manager_email.is_empty(), "The manager email must not be empty");
        ensure!(
            estimated_completion >= opened,
            "The estimated completion {estimated_completion} is before the opening date {opened}"
        );
        ensure!(
            !estimated_cost.is_negative(),
            "The estimated cost must not be negative, got {estimated_cost}"
        );
        ensure!(
            significant_digits(estimated_cost.value()) <= SIGNIFICANT_DIGITS,
            "The estimated cost has more than {SIGNIFICANT_DIGITS} significant digits, got {}",
            estimated_cost.value()
        );
        let mut seen = HashSet::new();
        for p in &participants {
            if !seen.insert(p.email().to_lowercase()) {
                bail!("The email '{}' is listed for more than one participant", p.email())
            }
        }
        Ok(Self {
            manager,
            manager_email,
            opened,
            estimated_completion,
            estimated_cost,
            participants,
        })
    }

    pub fn manager(&self) -> &str {
        &self.manager
    }

    pub fn manager_email(&self) -> &str {
        &self.manager_email
    }

    pub fn opened(&self) -> NaiveDate {
        self.opened
    }

    pub fn estimated_completion(&self) -> NaiveDate {
        self.estimated_completion
    }

    pub fn estimated_cost(&self) -> Money {
        self.estimated_cost
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Res<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .with_context(|| format!("'{s}' is not a date in the form YYYY-MM-DD"))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_project_name_normalization() {
        let name = ProjectName::new("  Casa da   Praia ").unwrap();
        assert_eq!(name.as_str(), "Casa_da_Praia");
        assert_eq!(name.to_string(), "Casa_da_Praia");
    }

    #[test]
    fn test_project_name_rejects_paths() {
        assert!(ProjectName::new("").is_err());
        assert!(ProjectName::new("   ").is_err());
        assert!(ProjectName::new("../etc").is_err());
        assert!(ProjectName::new("a\\b").is_err());
        assert!(ProjectName::new("..").is_err());
        assert!(ProjectName::new("what?").is_err());
    }

    #[test]
    fn test_participant_from_str() {
        let p: Participant = "Ana Souza, ana@example.com".parse().unwrap();
        assert_eq!(p.name(), "Ana Souza");
        assert_eq!(p.email(), "ana@example.com");
        assert_eq!(p.phone(), None);

        let p: Participant = "Bo,bo@example.com,555-0100".parse().unwrap();
        assert_eq!(p.phone(), Some("555-0100"));

        assert!("just a name".parse::<Participant>().is_err());
        assert!(",x@example.com".parse::<Participant>().is_err());
    }

    #[test]
    fn test_project_info_validation() {
        let cost = Money::from_str("1000").unwrap();
        let ok = ProjectInfo::new(
            "Maria",
            "maria@example.com",
            date("2025-01-10"),
            date("2025-06-30"),
            cost,
            vec![],
        );
        assert!(ok.is_ok());

        let backwards = ProjectInfo::new(
            "Maria",
            "maria@example.com",
            date("2025-06-30"),
            date("2025-01-10"),
            cost,
            vec![],
        );
        assert!(backwards.is_err());

        let dupes = ProjectInfo::new(
            "Maria",
            "maria@example.com",
            date("2025-01-10"),
            date("2025-06-30"),
            cost,
            vec![
                "A,same@example.com".parse().unwrap(),
                "B,SAME@example.com".parse().unwrap(),
            ],
        );
        let msg = dupes.unwrap_err().to_string();
        assert!(msg.contains("more than one participant"));

        let too_precise = ProjectInfo::new(
            "Maria",
            "maria@example.com",
            date("2025-01-10"),
            date("2025-06-30"),
            Money::from_str("12345678901234567.89").unwrap(),
            vec![],
        );
        assert!(too_precise.is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(format_date(date(" 2025-02-03 ")), "2025-02-03");
        assert!(parse_date("03/02/2025").is_err());
    }

    #[test]
    fn test_project_name_serde() {
        let name = ProjectName::new("Big Build").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"Big_Build\"");
        assert!(serde_json::from_str::<ProjectName>("\"a/b\"").is_err());
    }
}
