//! Tradeline admin CLI - session client for the marketplace admin console

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use crate::commands::Commands;
use crate::config::Settings;
use std::path::PathBuf;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "tradeline-admin")]
#[command(about = "Sign in to the Tradeline admin console and call its API")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML or YAML)
    #[arg(short = 'c', long, global = true, env = "TRADELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init_logging(cli.log_level.into(), cli.json_logs)?;

    let settings = Settings::load(cli.config.as_deref())?;
    info!(base_url = %settings.api.base_url, "Starting Tradeline admin CLI");

    match cli.command.execute(&settings).await {
        Ok(()) => {
            info!("Command completed successfully");
        }
        Err(e) => {
            error!("Command failed: {e:#}");
            std::process::exit(1);
        }
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
