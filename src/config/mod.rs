//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - CLI arguments
//!
//! ```toml
//! [store]
//! path = "/home/user/.config/fakexrandr.bin"
//!
//! [synthesis]
//! edid_property = "EDID"
//! max_edid_bytes = 384
//! name_separator = "~"
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod types;

pub use types::{default_store_path, LoggingConfig, StoreConfig, SynthesisConfig};

use crate::splits::store::EDID_LEN;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Split configuration store
    #[serde(default)]
    pub store: StoreConfig,
    /// Synthesis configuration
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config {
            store: StoreConfig::default(),
            synthesis: SynthesisConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.synthesis.edid_property.is_empty() {
            anyhow::bail!("EDID property name must not be empty");
        }

        if self.synthesis.max_edid_bytes == 0 || self.synthesis.max_edid_bytes * 2 > EDID_LEN {
            anyhow::bail!(
                "max_edid_bytes must be between 1 and {}, got {}",
                EDID_LEN / 2,
                self.synthesis.max_edid_bytes
            );
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            _ => anyhow::bail!("Invalid log format: {}", self.logging.format),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    ///
    /// The result is validated again, so overrides obey the same rules as
    /// file settings.
    pub fn with_overrides(
        mut self,
        store: Option<PathBuf>,
        log_format: Option<String>,
        log_file: Option<PathBuf>,
    ) -> Result<Self> {
        if let Some(path) = store {
            self.store.path = path;
        }
        if let Some(format) = log_format {
            self.logging.format = format;
        }
        if log_file.is_some() {
            self.logging.log_file = log_file;
        }

        self.validate().context("Invalid config after command-line overrides")?;
        Ok(self)
    }
}
