//! These structs provide the CLI interface for the tally CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// tally: A command-line tool for tracking what a project costs.
///
/// Each project gets its own spreadsheet holding its line items, the totals per category with a
/// bar chart, and the project information. A summary spreadsheet holds the latest total cost of
/// every project. When a project is opened, its participants can be notified by email.
///
/// Start with `tally init`, then `tally project new`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the tally home directory and its default configuration.
    ///
    /// The home directory is ~/tally unless --tally-home or TALLY_HOME says otherwise. Sheet
    /// names, header labels and the currency format can be changed afterwards in
    /// $TALLY_HOME/config.json.
    Init,
    /// Create, list, show or delete projects.
    Project(ProjectArgs),
    /// Add, import or remove the line items of a project.
    Items(ItemsArgs),
    /// Show the latest total cost of every project.
    Summary,
    /// Email the participants of a project.
    Notify(NotifyArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the project documents and configuration are held. Defaults to ~/tally
    #[arg(long, env = "TALLY_HOME", default_value_t = default_tally_home())]
    tally_home: DisplayPath,

    /// The password the project manager's email account uses with the SMTP relay. Usually an
    /// application password. Only needed to send notifications; it can also be put in a .env
    /// file.
    #[arg(long, env = "TALLY_SMTP_PASSWORD", hide_env_values = true)]
    smtp_password: Option<Secret>,
}

impl Common {
    pub fn new(log_level: LevelFilter, tally_home: PathBuf) -> Self {
        Self {
            log_level,
            tally_home: tally_home.into(),
            smtp_password: None,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn tally_home(&self) -> &DisplayPath {
        &self.tally_home
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.smtp_password.as_ref().map(|s| s.0.as_str())
    }
}

/// (Not shown): Args for the `tally project` command.
#[derive(Debug, Parser, Clone)]
pub struct ProjectArgs {
    #[command(subcommand)]
    action: ProjectSubcommand,
}

impl ProjectArgs {
    pub fn new(action: ProjectSubcommand) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &ProjectSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProjectSubcommand {
    /// Save the information of a new project, or update the information of an existing one.
    ///
    /// The items of an existing project are kept.
    New(ProjectNewArgs),
    /// List the projects found in the tally home directory.
    List,
    /// Show the items, category totals and information of a project.
    Show(ProjectNameArgs),
    /// Delete a project document and its row in the summary.
    Delete(ProjectNameArgs),
}

/// (Not shown): Args for the `tally project new` command.
#[derive(Debug, Parser, Clone)]
pub struct ProjectNewArgs {
    /// The project name. Spaces become underscores; path characters are not allowed.
    name: String,

    /// The name of the project manager.
    #[arg(long)]
    manager: String,

    /// The email address of the project manager. Notifications are sent from this address.
    #[arg(long)]
    manager_email: String,

    /// The opening date, YYYY-MM-DD.
    #[arg(long)]
    opened: String,

    /// The estimated completion date, YYYY-MM-DD.
    #[arg(long)]
    completion: String,

    /// The estimated cost, e.g. 12500 or $12,500.00
    #[arg(long)]
    estimated_cost: String,

    /// A participant as "Name,email" or "Name,email,phone". Repeat for each participant.
    #[arg(long = "participant")]
    participants: Vec<String>,

    /// Email the participants once the project is saved.
    #[arg(long)]
    notify: bool,
}

impl ProjectNewArgs {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        manager: impl Into<String>,
        manager_email: impl Into<String>,
        opened: impl Into<String>,
        completion: impl Into<String>,
        estimated_cost: impl Into<String>,
        participants: Vec<String>,
        notify: bool,
    ) -> Self {
        Self {
            name: name.into(),
            manager: manager.into(),
            manager_email: manager_email.into(),
            opened: opened.into(),
            completion: completion.into(),
            estimated_cost: estimated_cost.into(),
            participants,
            notify,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manager(&self) -> &str {
        &self.manager
    }

    pub fn manager_email(&self) -> &str {
        &self.manager_email
    }

    pub fn opened(&self) -> &str {
        &self.opened
    }

    pub fn completion(&self) -> &str {
        &self.completion
    }

    pub fn estimated_cost(&self) -> &str {
        &self.estimated_cost
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn notify(&self) -> bool {
        self.notify
    }
}

/// (Not shown): Args for commands that only take a project name.
#[derive(Debug, Parser, Clone)]
pub struct ProjectNameArgs {
    /// The project name.
    name: String,
}

impl ProjectNameArgs {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// (Not shown): Args for the `tally items` command.
#[derive(Debug, Parser, Clone)]
pub struct ItemsArgs {
    #[command(subcommand)]
    action: ItemsSubcommand,
}

impl ItemsArgs {
    pub fn new(action: ItemsSubcommand) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &ItemsSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ItemsSubcommand {
    /// Append one line item to a project. The project is created if it does not exist.
    Add(ItemAddArgs),
    /// Replace all line items of a project with the rows of a CSV file.
    ///
    /// The file must have the header: Description,Quantity,Unit,Unit Price
    Import(ItemImportArgs),
    /// Remove the line item at a position (1 is the first item).
    Remove(ItemRemoveArgs),
}

/// (Not shown): Args for the `tally items add` command.
#[derive(Debug, Parser, Clone)]
pub struct ItemAddArgs {
    /// The project name.
    project: String,

    /// What the item is. Items with the same description are totaled together.
    #[arg(long)]
    description: String,

    /// How many units, greater than zero.
    #[arg(long)]
    quantity: String,

    /// The unit of measure, e.g. bag or hour.
    #[arg(long, default_value = "")]
    unit: String,

    /// The price of one unit, e.g. 25 or $25.00
    #[arg(long)]
    unit_price: String,
}

impl ItemAddArgs {
    pub fn new(
        project: impl Into<String>,
        description: impl Into<String>,
        quantity: impl Into<String>,
        unit: impl Into<String>,
        unit_price: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            description: description.into(),
            quantity: quantity.into(),
            unit: unit.into(),
            unit_price: unit_price.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> &str {
        &self.quantity
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn unit_price(&self) -> &str {
        &self.unit_price
    }
}

/// (Not shown): Args for the `tally items import` command.
#[derive(Debug, Parser, Clone)]
pub struct ItemImportArgs {
    /// The project name.
    project: String,

    /// The CSV file to read.
    file: PathBuf,
}

impl ItemImportArgs {
    pub fn new(project: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            file: file.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

/// (Not shown): Args for the `tally items remove` command.
#[derive(Debug, Parser, Clone)]
pub struct ItemRemoveArgs {
    /// The project name.
    project: String,

    /// The position of the item, as listed by `tally project show`.
    position: usize,
}

impl ItemRemoveArgs {
    pub fn new(project: impl Into<String>, position: usize) -> Self {
        Self {
            project: project.into(),
            position,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

/// (Not shown): Args for the `tally notify` command.
#[derive(Debug, Parser, Clone)]
pub struct NotifyArgs {
    /// The project whose participants will be emailed.
    project: String,
}

impl NotifyArgs {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }
}

fn default_tally_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("tally"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --tally-home or TALLY_HOME instead of relying on the default \
                tally home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("tally")
        }
    })
}

/// A string that is never printed, so that `Args` can be logged.
#[derive(Clone, Eq, PartialEq)]
pub struct Secret(String);

impl Debug for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(***)")
    }
}

impl FromStr for Secret {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items_add() {
        let args = Args::try_parse_from([
            "tally",
            "--tally-home",
            "/tmp/tally",
            "items",
            "add",
            "House",
            "--description",
            "Cement",
            "--quantity",
            "10",
            "--unit",
            "bag",
            "--unit-price",
            "25",
        ])
        .unwrap();
        assert_eq!(args.common().tally_home().path(), Path::new("/tmp/tally"));
        let Command::Items(items) = args.command() else {
            panic!("expected items")
        };
        let ItemsSubcommand::Add(add) = items.action() else {
            panic!("expected add")
        };
        assert_eq!(add.project(), "House");
        assert_eq!(add.unit_price(), "25");
    }

    #[test]
    fn test_parse_project_new_with_participants() {
        let args = Args::try_parse_from([
            "tally",
            "project",
            "new",
            "House",
            "--manager",
            "Maria",
            "--manager-email",
            "maria@example.com",
            "--opened",
            "2025-03-01",
            "--completion",
            "2025-09-30",
            "--estimated-cost",
            "12500",
            "--participant",
            "Ana,ana@example.com",
            "--participant",
            "Bo,bo@example.com,555",
            "--notify",
        ])
        .unwrap();
        let Command::Project(project) = args.command() else {
            panic!("expected project")
        };
        let ProjectSubcommand::New(new) = project.action() else {
            panic!("expected new")
        };
        assert_eq!(new.participants().len(), 2);
        assert!(new.notify());
    }

    #[test]
    fn test_secret_is_not_printed() {
        let secret = Secret::from_str("hunter2").unwrap();
        assert!(!format!("{secret:?}").contains("hunter2"));
    }
}
