pub mod bootstrap;
pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fundy_core::config::{AppConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "fundy",
    about = "ERP fund-request assistant CLI",
    long_about = "Chat with the ERP knowledge service and turn fund-request utterances into \
                  budget-validated, recorded orders.",
    after_help = "Examples:\n  fundy ask \"Request 500 for marketing\"\n  fundy registry --json\n  fundy doctor --json"
)]
pub struct Cli {
    /// Path to the config file (defaults to fundy.toml, then config/fundy.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run one utterance through the assistant and print the outcome")]
    Ask {
        /// Employee utterance, e.g. "Request 500 for marketing"
        text: String,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Interactive chat session on stdin/stdout")]
    Chat,
    #[command(about = "Load the project registry and report the ledger plus skipped lines")]
    Registry {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List orders recorded in the order store")]
    Orders {
        #[arg(long, help = "Show only the most recent N orders")]
        limit: Option<usize>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Validate config, registry, order store, and knowledge-service readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Write a small demo project registry to the configured path")]
    Seed {
        #[arg(long, help = "Overwrite an existing registry file")]
        force: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Command::Ask { text, json } => commands::ask::run(config_path, &text, json),
        Command::Chat => commands::chat::run(config_path),
        Command::Registry { json } => commands::registry::run(config_path, json),
        Command::Orders { limit, json } => commands::orders::run(config_path, limit, json),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(config_path) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(config_path, json) }
        }
        Command::Seed { force } => commands::seed::run(config_path, force),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Installs the global tracing subscriber from the logging config. Safe to
/// call more than once; later calls keep the first subscriber.
pub(crate) fn init_logging(config: &AppConfig) {
    let max_level = config
        .logging
        .level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    let result = match config.logging.format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .compact()
            .with_max_level(max_level)
            .with_target(false)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .pretty()
            .with_max_level(max_level)
            .with_target(false)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_max_level(max_level)
            .with_target(false)
            .try_init(),
    };
    let _ = result;
}
