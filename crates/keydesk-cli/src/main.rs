//! KeyDesk CLI
//!
//! Front-desk interface for the key custody tracker. Scans are accepted
//! either one-shot (`keydesk scan`) or interactively (`keydesk desk`);
//! `status` and `log` inspect the key board and the entry log.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::desk::DeskCommand;
use commands::log::LogCommand;
use commands::resync::ResyncCommand;
use commands::scan::ScanCommand;
use commands::status::StatusCommand;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "keydesk", version, about = "Library key custody tracker")]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process scanner tokens in order (badges and keys are auto-detected)
    Scan(ScanCommand),
    /// Show the key board
    Status(StatusCommand),
    /// Show recent entry log rows
    Log(LogCommand),
    /// Run the interactive front desk loop on stdin
    Desk(DeskCommand),
    /// Rewrite the key status registry from the in-memory board
    Resync(ResyncCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;

    // RUST_LOG wins; otherwise the flags, falling back on the configured level.
    let filter = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Scan(cmd) => cmd.execute(&config, format).await,
        Commands::Status(cmd) => cmd.execute(&config, format).await,
        Commands::Log(cmd) => cmd.execute(&config, format).await,
        Commands::Desk(cmd) => cmd.execute(&config, format).await,
        Commands::Resync(cmd) => cmd.execute(&config, format).await,
    }
}
