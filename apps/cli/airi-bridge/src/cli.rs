//! Command-line surface.

use crate::error::CliError;

use bridge_core::config::BridgeConfig;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::info;

/// Config file looked up in the working directory when `--config` is absent.
pub const LOCAL_CONFIG_PATH: &str = "config/airi.yaml";

const APP_DIR_NAME: &str = "airi-bridge";
const CONFIG_FILE_NAME: &str = "airi.yaml";
const DEFAULT_WAIT_SECS: &str = "5";

/// Bridge a local assistant to an AIRI companion app.
#[derive(Debug, Parser)]
#[command(name = "airi-bridge", version, about)]
pub struct Cli {
    /// Path to a YAML or TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at trace level.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Directory for the log file (defaults to the platform data directory).
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Connect and print replies until Ctrl-C (default when no subcommand is given).
    Connect,
    /// Print the status of a fresh connector.
    Status,
    /// Send a chat message and print replies for a while.
    Say {
        /// The message to send.
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
        /// Seconds to wait for replies before disconnecting.
        #[arg(long, default_value = DEFAULT_WAIT_SECS)]
        wait_secs: u64,
    },
    /// Ask the companion to say something out loud.
    Speak {
        /// The text to speak.
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
        /// Emotion hint, e.g. "happy".
        #[arg(long)]
        emotion: Option<String>,
        /// Speech rate multiplier.
        #[arg(long)]
        speed: Option<f64>,
        /// Seconds to wait before disconnecting.
        #[arg(long, default_value = DEFAULT_WAIT_SECS)]
        wait_secs: u64,
    },
    /// Disconnect a fresh connector (no-op, prints the result).
    Disconnect,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Connect)
    }
}

/// Pick the config file: `--config`, then `config/airi.yaml` under `cwd`,
/// then the per-user config directory.
pub fn resolve_config_path(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let local = cwd.join(LOCAL_CONFIG_PATH);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .unwrap_or(local)
}

/// Load the config file, apply `AIRI_URL`/`AIRI_TOKEN` and validate the result.
pub fn load_config(path: &Path) -> Result<BridgeConfig, CliError> {
    let mut config = BridgeConfig::load(path)?;
    config.apply_env_overrides();
    config.validate()?;

    info!("Peer URL: {}", config.url());
    Ok(config)
}

/// Default log directory: `<data dir>/airi-bridge/logs`, or the temp dir.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR_NAME))
}

/// Join the positional words of `say`/`speak` back into one message.
pub fn join_words(words: &[String]) -> String {
    words.join(" ")
}
