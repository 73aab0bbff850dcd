pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use tally_core::config::{AppConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "tally",
    about = "Tally operator CLI",
    long_about = "Operate the Tally bookkeeping assistant: interactive chat, migrations, \
                  config inspection, and readiness checks.",
    after_help = "Examples:\n  tally chat\n  tally chat --offline\n  tally migrate\n  tally doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive chat session against the ledger")]
    Chat {
        #[arg(long, help = "Skip the remote interpreter and use rule matching only")]
        offline: bool,
        #[arg(long, help = "Use an in-memory ledger instead of the configured database")]
        ephemeral: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Validate config and database connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { offline, ephemeral } => commands::chat::run(offline, ephemeral),
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}

pub(crate) fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}
