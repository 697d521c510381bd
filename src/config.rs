//! Configuration file handling for tally.
//!
//! The configuration file is stored at `$TALLY_HOME/config.json`. It holds the document layout
//! (file names, sheet names and header labels), the currency format, backup settings and the SMTP
//! relay used for notifications. The SMTP password is never stored here; it comes from the
//! environment.

use crate::backup::Backup;
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::ProjectName;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "tally";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const BACKUPS: &str = ".backups";
const CONFIG_JSON: &str = "config.json";
const XLSX: &str = "xlsx";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$TALLY_HOME` and from there it loads `$TALLY_HOME/config.json`. It provides the
/// paths of the documents kept in the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory, its backups subdirectory and an initial `config.json` with
    /// default settings.
    ///
    /// # Errors
    /// - Returns an error if `config.json` already exists or any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::create_inner(dir.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(maybe_relative: PathBuf) -> Res<Self> {
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the tally home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "A config file already exists at '{}', refusing to overwrite it",
                config_path.display()
            )
        }
        let config_file = ConfigFile::default();
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            backups,
            config_path,
            config_file,
        })
    }

    /// This will
    /// - validate that `tally_home` exists and that the config file exists
    /// - load the config file
    /// - validate that the backups directory exists
    pub async fn load(tally_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(tally_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_inner(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Tally home is missing, run 'tally init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!(
                "The config file is missing '{}', run 'tally init' first",
                config_path.display()
            )
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            root: root.clone(),
            backups: root.join(BACKUPS),
            config_path,
            config_file,
        };
        if !config.backups.is_dir() {
            bail!(
                "The backups directory is missing '{}'",
                config.backups.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// Creates a new `Backup` instance for keeping copies of documents before they are replaced.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }

    pub fn document_prefix(&self) -> &str {
        &self.config_file.document_prefix
    }

    /// The path of a project's document: `<root>/<prefix><name>.xlsx`.
    pub fn project_path(&self, name: &ProjectName) -> PathBuf {
        self.root
            .join(format!("{}{}.{XLSX}", self.document_prefix(), name))
    }

    /// The inverse of `project_path`: returns the project name if `file_name` looks like a
    /// project document.
    pub fn project_name_from_file(&self, file_name: &str) -> Option<ProjectName> {
        let stem = file_name
            .strip_prefix(self.document_prefix())?
            .strip_suffix(&format!(".{XLSX}"))?;
        ProjectName::new(stem).ok().filter(|n| n.as_str() == stem)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join(&self.config_file.summary_file)
    }

    pub fn currency_symbol(&self) -> &str {
        &self.config_file.currency_symbol
    }

    /// The Excel number format applied to money cells, e.g. `"$"#,##0.00`.
    pub fn currency_format(&self) -> &str {
        &self.config_file.currency_format
    }

    pub fn labels(&self) -> &Labels {
        &self.config_file.labels
    }

    pub fn smtp_host(&self) -> &str {
        &self.config_file.smtp_host
    }

    pub fn smtp_port(&self) -> u16 {
        self.config_file.smtp_port
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "tally",
///   "config_version": 1,
///   "backup_copies": 5,
///   "document_prefix": "project_",
///   "summary_file": "summary.xlsx",
///   "currency_symbol": "$",
///   "currency_format": "\"$\"#,##0.00",
///   "smtp_host": "smtp.gmail.com",
///   "smtp_port": 465
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
struct ConfigFile {
    /// Application name, should always be "tally"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Number of backup copies to keep per document
    backup_copies: u32,

    /// Project documents are named `<document_prefix><project name>.xlsx`
    document_prefix: String,

    /// File name of the cross-project summary document
    summary_file: String,

    /// Symbol used when printing amounts to the terminal
    currency_symbol: String,

    /// Excel number format for money cells
    currency_format: String,

    smtp_host: String,

    smtp_port: u16,

    /// Sheet names and header texts
    labels: Labels,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backup_copies: BACKUP_COPIES,
            document_prefix: "project_".to_string(),
            summary_file: "summary.xlsx".to_string(),
            currency_symbol: "$".to_string(),
            currency_format: "\"$\"#,##0.00".to_string(),
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
            labels: Labels::default(),
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path. Missing fields take their default values.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it is not a tally config.
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)
            .await
            .with_context(|| format!("Failed to load config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            !config.document_prefix.is_empty(),
            "The document_prefix in the config file must not be empty"
        );
        anyhow::ensure!(
            !config.summary_file.starts_with(&config.document_prefix),
            "The summary_file '{}' must not start with the document_prefix '{}'",
            config.summary_file,
            config.document_prefix
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

/// The texts written into the documents. These are presentation only: the layout (which column
/// holds what, where each section starts) is fixed.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Labels {
    pub items_sheet: String,
    pub info_sheet: String,
    pub summary_sheet: String,
    /// The five item table headers: description, quantity, unit, unit price, total.
    pub item_headers: [String; 5],
    pub totals_title: String,
    /// The two ledger table headers: category, total.
    pub totals_headers: [String; 2],
    pub chart_title: String,
    pub chart_x_axis: String,
    pub chart_y_axis: String,
    /// The two information table headers: field, value.
    pub info_headers: [String; 2],
    /// Manager, manager email, opening date, estimated completion, estimated cost.
    pub info_fields: [String; 5],
    /// Participant name, email, phone.
    pub participant_headers: [String; 3],
    /// Project, total cost.
    pub summary_headers: [String; 2],
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            items_sheet: "Items".into(),
            info_sheet: "Information".into(),
            summary_sheet: "Summary".into(),
            item_headers: [
                "Description".into(),
                "Quantity".into(),
                "Unit".into(),
                "Unit Price".into(),
                "Total".into(),
            ],
            totals_title: "Totals by Category".into(),
            totals_headers: ["Category".into(), "Total".into()],
            chart_title: "Totals by Category".into(),
            chart_x_axis: "Category".into(),
            chart_y_axis: "Total".into(),
            info_headers: ["Field".into(), "Value".into()],
            info_fields: [
                "Manager".into(),
                "Manager Email".into(),
                "Opening Date".into(),
                "Estimated Completion".into(),
                "Estimated Cost".into(),
            ],
            participant_headers: ["Name".into(), "Email".into(), "Phone".into()],
            summary_headers: ["Project".into(), "Total Cost".into()],
        }
    }
}
