use crate::config::AppConfig;
use crate::errors::AppResult;
use clap::{Parser, Subcommand};

pub mod commands;

/// Database connection handle probe
#[derive(Parser)]
#[command(name = "data-connection")]
#[command(about = "Inspect configured data sources and exercise connection handles")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List configured data sources
    List(commands::list::ListCommand),
    /// Open a connection handle, optionally run a statement, then dispose it
    Probe(commands::probe::ProbeCommand),
}

pub fn run() -> AppResult<()> {
    // RUST_LOG wins; otherwise use logging.filter from configuration
    let fallback_filter = AppConfig::load()
        .map(|config| config.logging.filter)
        .unwrap_or_else(|_| "error".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback_filter)),
        )
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List(command) => command.run(),
        Commands::Probe(command) => command.run(),
    }
}
