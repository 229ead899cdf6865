//! rexlink CLI configuration
//!
//! One TOML file with a table per layer. Every field is optional; missing
//! values take the library defaults. Durations are written in milliseconds.
//!
//! ```toml
//! [ble]
//! name_prefixes = ["REX", "T-Rex"]
//! scan_timeout_ms = 10000
//!
//! [queue]
//! max_chunk_size = 18
//! busy_retry_delay_ms = 30
//!
//! [dispatch]
//! hold_interval_ms = 140
//! ```

use std::path::{Path, PathBuf};

use rexlink_ble::BleLinkConfig;
use rexlink_core::{DispatchConfig, QueueConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the rexlink CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ble: BleLinkConfig,
    pub queue: QueueConfig,
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Load the per-user file if one exists, defaults otherwise
    pub fn load_default() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.is_file() => {
                debug!("Loading configuration from {}", path.display());
                Self::load_from_file(path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.queue.validate()?;
        self.dispatch.validate()?;
        if self.ble.scan_timeout.is_zero() {
            return Err(CliError::Config("ble.scan_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    /// `<config dir>/rexlink/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rexlink").join("config.toml"))
    }
}
