//! Bridge configuration.
//!
//! The connector consumes a fully resolved [`BridgeConfig`] at construction
//! time and never mutates it. Loading, env overrides and validation live here
//! so that the state machine only ever sees a value that passed
//! [`BridgeConfig::validate`].

use crate::AIRI_DEFAULT_URL;
use crate::error::config::ConfigError;
use crate::event::WireFormat;

use common::{ErrorLocation, RedactedToken};

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::Deserialize;

pub const ENV_URL: &str = "AIRI_URL";
pub const ENV_TOKEN: &str = "AIRI_TOKEN";

/// Ceiling value meaning "retry forever".
pub const UNLIMITED_RECONNECT_ATTEMPTS: i64 = -1;

const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;
const DEFAULT_PLUGIN_ID: &str = "openclaw-bridge";
const DEFAULT_PLUGIN_VERSION: &str = "1.0.0";
const DEFAULT_PLUGIN_NAME: &str = "OpenClaw Bridge";
const DEFAULT_PLUGIN_DESCRIPTION: &str = "Bridge between OpenClaw and AIRI";

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub token: Option<RedactedToken>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: i64,
    /// Milliseconds between outbound pings.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: u64,
    #[serde(default)]
    pub wire_format: WireFormat,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: default_auto_reconnect(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            heartbeat_interval: default_heartbeat_interval(),
            wire_format: WireFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiriConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
}

impl Default for AiriConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            auth: AuthConfig::default(),
            connection: ConnectionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfig {
    #[serde(default = "default_plugin_id")]
    pub plugin_id: String,
    #[serde(default = "default_plugin_version")]
    pub version: String,
    #[serde(default = "default_plugin_name")]
    pub name: String,
    #[serde(default = "default_plugin_description")]
    pub description: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            plugin_id: default_plugin_id(),
            version: default_plugin_version(),
            name: default_plugin_name(),
            description: default_plugin_description(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub airi: AiriConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_url() -> String {
    AIRI_DEFAULT_URL.to_string()
}
fn default_auto_reconnect() -> bool {
    true
}
fn default_max_reconnect_attempts() -> i64 {
    UNLIMITED_RECONNECT_ATTEMPTS
}
fn default_heartbeat_interval() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}
fn default_plugin_id() -> String {
    DEFAULT_PLUGIN_ID.to_string()
}
fn default_plugin_version() -> String {
    DEFAULT_PLUGIN_VERSION.to_string()
}
fn default_plugin_name() -> String {
    DEFAULT_PLUGIN_NAME.to_string()
}
fn default_plugin_description() -> Option<String> {
    Some(DEFAULT_PLUGIN_DESCRIPTION.to_string())
}

// ============================================
// IMPLEMENTATION
// ============================================

impl BridgeConfig {
    /// Load config from a YAML (`.yaml`/`.yml`) or TOML (`.toml`) file.
    ///
    /// A missing file yields defaults. A file that exists but cannot be read,
    /// parsed or validated is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            warn!("Failed to read config file {}: {}", path.display(), e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        let config = Self::parse(&contents, path)?;
        config.validate()?;

        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Parse `contents`, picking the format from `path`'s extension.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let parsed = match extension.as_deref() {
            Some("toml") => toml::from_str::<BridgeConfig>(contents).map_err(|e| e.to_string()),
            Some("yaml") | Some("yml") | None => {
                if contents.trim().is_empty() {
                    Ok(Self::default())
                } else {
                    serde_yaml::from_str::<BridgeConfig>(contents).map_err(|e| e.to_string())
                }
            }
            Some(other) => Err(format!("Unsupported config extension: .{other}")),
        };

        parsed.map_err(|reason| {
            warn!("Failed to parse config {}: {}", path.display(), reason);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason,
            }
        })
    }

    /// Apply `AIRI_URL` / `AIRI_TOKEN` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_URL).filter(|u| !u.trim().is_empty()) {
            info!("Using peer URL from {ENV_URL}: {url}");
            self.airi.url = url;
        }

        if let Some(token) = lookup(ENV_TOKEN).filter(|t| !t.is_empty()) {
            let token = RedactedToken::new(token);
            info!("Using credential from {ENV_TOKEN} ({} chars)", token.len());
            self.airi.auth.token = Some(token);
        }
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.airi.url).map_err(|e| {
            ConfigError::validation(format!("Invalid peer URL '{}': {e}", self.airi.url))
        })?;

        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ConfigError::validation(format!(
                "Peer URL must use ws:// or wss://, got {}",
                self.airi.url
            )));
        }

        if self.airi.connection.heartbeat_interval == 0 {
            return Err(ConfigError::validation(
                "heartbeatInterval must be greater than 0",
            ));
        }

        if self.airi.connection.max_reconnect_attempts < UNLIMITED_RECONNECT_ATTEMPTS {
            return Err(ConfigError::validation(format!(
                "Invalid maxReconnectAttempts: {} (must be -1 or greater)",
                self.airi.connection.max_reconnect_attempts
            )));
        }

        if self.identity.plugin_id.trim().is_empty() {
            return Err(ConfigError::validation("identity.pluginId cannot be empty"));
        }

        Ok(())
    }

    pub fn url(&self) -> &str {
        &self.airi.url
    }

    pub fn token(&self) -> Option<&RedactedToken> {
        self.airi.auth.token.as_ref()
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.airi.connection.heartbeat_interval)
    }

    /// Attempt ceiling, `None` when unlimited. Zero is treated as unlimited
    /// as well, which is how existing config files use it.
    pub fn reconnect_limit(&self) -> Option<u32> {
        match self.airi.connection.max_reconnect_attempts {
            n if n <= 0 => None,
            n => Some(u32::try_from(n).unwrap_or(u32::MAX)),
        }
    }
}
