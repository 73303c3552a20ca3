use crate::error::config::ConfigError;
use crate::{DEFAULT_RETRY_DELAY, DO_NOT_RECONNECT_CLOSE_CODE};

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

pub const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_VERSION: u32 = 1;

/// Close codes an application may use for its own conventions (RFC 6455 §7.4.2).
const PRIVATE_CLOSE_CODES: std::ops::RangeInclusive<u16> = 4000..=4999;
const MAX_RETRY_DELAY_MS: u64 = 10 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Page the client attaches to when none is given on the command line.
    #[serde(default)]
    pub page_url: Option<String>,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Remote close code meaning "do not reconnect". `None` retries every remote close.
    #[serde(default = "default_terminal_close_code")]
    pub terminal_close_code: Option<u16>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            page_url: None,
            retry_delay_ms: default_retry_delay_ms(),
            terminal_close_code: default_terminal_close_code(),
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY.as_millis() as u64
}
fn default_terminal_close_code() -> Option<u16> {
    Some(DO_NOT_RECONNECT_CLOSE_CODE)
}

impl ClientConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Load config from {config_dir}/config.json.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is unreadable, corrupted or invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: ClientConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/config.json using temp file + rename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation, serialization,
    /// the write or the rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::validation(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        if self.retry_delay_ms == 0 || self.retry_delay_ms > MAX_RETRY_DELAY_MS {
            return Err(ConfigError::validation(format!(
                "Invalid retry delay: {}ms (must be 1-{})",
                self.retry_delay_ms, MAX_RETRY_DELAY_MS
            )));
        }

        if let Some(code) = self.terminal_close_code {
            if !PRIVATE_CLOSE_CODES.contains(&code) {
                return Err(ConfigError::validation(format!(
                    "Invalid terminal close code: {} (must be {}-{})",
                    code,
                    PRIVATE_CLOSE_CODES.start(),
                    PRIVATE_CLOSE_CODES.end()
                )));
            }
        }

        if let Some(ref page_url) = self.page_url {
            let url = Url::parse(page_url).map_err(|e| {
                ConfigError::validation(format!("Invalid page URL {}: {}", page_url, e))
            })?;

            if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
                return Err(ConfigError::validation(format!(
                    "Unsupported page URL scheme: {}",
                    url.scheme()
                )));
            }
        }

        Ok(())
    }
}
