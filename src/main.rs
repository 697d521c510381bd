use clap::Parser;
use std::process::ExitCode;
use tally::args::{Args, Command, ItemsSubcommand, ProjectSubcommand};
use tally::{commands, Config, Mode, Result};
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // A .env file may hold TALLY_HOME or TALLY_SMTP_PASSWORD. It must be loaded before the
    // arguments are parsed so that clap sees those variables.
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());
    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error ({}): {e}", e.error_type());
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().tally_home().path();
    let smtp_password = args.common().smtp_password();

    // This allows for running the program without sending email. When TALLY_IN_TEST_MODE is set
    // and non-zero in length, then the mode will be Mode::Test, otherwise it will be Mode::Smtp.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init => commands::init(home).await?.print(),

        Command::Project(project_args) => {
            let config = Config::load(home).await?;
            match project_args.action() {
                ProjectSubcommand::New(args) => {
                    commands::project_new(config, mode, args, smtp_password)
                        .await?
                        .print()
                }
                ProjectSubcommand::List => commands::project_list(config).await?.print(),
                ProjectSubcommand::Show(args) => {
                    commands::project_show(config, args.name()).await?.print()
                }
                ProjectSubcommand::Delete(args) => {
                    commands::project_delete(config, args.name()).await?.print()
                }
            }
        }

        Command::Items(items_args) => {
            let config = Config::load(home).await?;
            match items_args.action() {
                ItemsSubcommand::Add(args) => commands::items_add(config, args).await?.print(),
                ItemsSubcommand::Import(args) => {
                    commands::items_import(config, args).await?.print()
                }
                ItemsSubcommand::Remove(args) => {
                    commands::items_remove(config, args).await?.print()
                }
            }
        }

        Command::Summary => commands::summary(Config::load(home).await?)
            .await?
            .print(),

        Command::Notify(notify_args) => {
            let config = Config::load(home).await?;
            commands::notify(config, mode, notify_args.project(), smtp_password)
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
