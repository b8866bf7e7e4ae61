//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Profiteer - Rate-governed market data aggregation for a game economy.
#[derive(Parser, Debug)]
#[command(name = "profiteer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the updater and the query API (foreground)
    Run(RunArgs),

    /// Validate the configuration file and exit
    Check(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Disable the full sequential update cycle
    #[arg(long)]
    pub no_full_cycle: bool,

    /// Enable the rotating single-server refresh
    #[arg(long)]
    pub rotating: bool,

    /// Disable webhook notifications regardless of configuration
    #[arg(long)]
    pub no_webhook: bool,
}
