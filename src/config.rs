//! Base station configuration
//!
//! Loaded from a TOML file; every section falls back to its defaults, and
//! server credentials can be supplied through the environment instead of the
//! file.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokenrelay_shared::{radio, timing};
use tracing::info;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_PATH: &str = "base-station.toml";

pub const ENV_USERNAME: &str = "TOKENRELAY_USERNAME";
pub const ENV_PASSWORD: &str = "TOKENRELAY_PASSWORD";
pub const ENV_SERVER_URL: &str = "TOKENRELAY_SERVER_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serial radio settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Serial device of the local XBee (e.g. "/dev/ttyUSB0" or "COM3")
    pub port: String,
    pub baud_rate: u32,
    /// 16-bit address of the remote module (0xFFFF broadcasts)
    pub destination: u16,
    /// Token bytes sent per transmission
    pub payload_len: usize,
    pub send_timeout_ms: u64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".into(),
            baud_rate: radio::DEFAULT_BAUD_RATE,
            destination: 0xFFFF,
            payload_len: radio::DEFAULT_PAYLOAD_LEN,
            send_timeout_ms: timing::SEND_TIMEOUT_MS,
        }
    }
}

/// Token server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    /// Path polled for the pending request
    pub poll_path: String,
    /// Path received packets are posted to
    pub submit_path: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            poll_path: "/token-requests/1".into(),
            submit_path: "/".into(),
            username: None,
            password: None,
            request_timeout_ms: timing::HTTP_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay after each completed cycle
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: timing::POLL_INTERVAL_MS,
        }
    }
}

/// Telemetry relay settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub enabled: bool,
    /// How long each cycle listens for inbound packets
    pub receive_window_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            receive_window_ms: timing::RECEIVE_WINDOW_MS,
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub radio: RadioConfig,
    pub server: ServerConfig,
    pub poll: PollConfig,
    pub relay: RelayConfig,
}

impl AppConfig {
    /// Load the config named on the command line, or the default file if present
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::read(default_path)?
                } else {
                    info!("Using default configuration");
                    AppConfig::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override server settings from the environment
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(username) = lookup(ENV_USERNAME) {
            self.server.username = Some(username);
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.server.password = Some(password);
        }
        if let Some(url) = lookup(ENV_SERVER_URL) {
            self.server.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.radio.port.trim().is_empty() {
            return Err(ConfigError::Invalid("radio.port must not be empty".into()));
        }
        if self.radio.payload_len == 0 || self.radio.payload_len > radio::MAX_PAYLOAD_LEN {
            return Err(ConfigError::Invalid(format!(
                "radio.payload_len must be between 1 and {}, got {}",
                radio::MAX_PAYLOAD_LEN,
                self.radio.payload_len
            )));
        }
        if self.radio.send_timeout_ms == 0 || self.server.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        if self.server.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("server.base_url must not be empty".into()));
        }
        if self.server.username.is_some() != self.server.password.is_some() {
            return Err(ConfigError::Invalid(
                "server.username and server.password must be set together".into(),
            ));
        }
        Ok(())
    }
}
