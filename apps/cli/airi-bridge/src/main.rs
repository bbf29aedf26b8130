use airi_bridge::cli::{Cli, default_log_dir, load_config, resolve_config_path};
use airi_bridge::commands;
use airi_bridge::error::CliError;
use airi_bridge::logger::initialize as LoggerInitialize;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // .env is optional
    let dotenv = dotenvy::dotenv().ok();

    let log_dir = cli.log_dir.clone().unwrap_or_else(default_log_dir);
    create_dir_all(&log_dir).map_err(|e| CliError::Logger {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir, cli.verbose)?;

    info!("airi-bridge {} starting", env!("CARGO_PKG_VERSION"));
    info!("Log directory: {}", log_dir.display());
    if let Some(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let cwd = std::env::current_dir()?;
    let config_path = resolve_config_path(cli.config.as_deref(), &cwd);
    let config = load_config(&config_path)?;

    commands::run(cli.command(), config).await
}
