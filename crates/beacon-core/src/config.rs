//! Hub configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (`BEACON_*`)
//! - TOML configuration file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting has an unusable value.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Hub configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Capacity of each connection's send queue.
    #[serde(default = "default_send_queue_size")]
    pub send_queue_size: usize,

    /// Freeze the event encoding once per broadcast.
    #[serde(default = "default_true")]
    pub precompute: bool,

    /// Drop the message when a connection's queue is full. When false the
    /// connection is disconnected instead.
    #[serde(default = "default_true")]
    pub drop_on_full_queue: bool,
}

// Default value functions
fn default_send_queue_size() -> usize {
    std::env::var("BEACON_SEND_QUEUE_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(256)
}

fn default_true() -> bool {
    true
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            send_queue_size: default_send_queue_size(),
            precompute: true,
            drop_on_full_queue: true,
        }
    }
}

impl HubConfig {
    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is invalid.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: HubConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `send_queue_size` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.send_queue_size == 0 {
            return Err(ConfigError::Invalid(
                "send_queue_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
