//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::multimon::MultiMonitorConfig;

/// File name of the split configuration inside the user config directory
pub const STORE_FILE_NAME: &str = "fakexrandr.bin";

/// Split configuration store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the binary split configuration
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// `$XDG_CONFIG_HOME/fakexrandr.bin`, or the working directory without one
pub fn default_store_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STORE_FILE_NAME)
}

/// Virtual output synthesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Output property holding the EDID
    pub edid_property: String,

    /// EDID bytes taken into the fingerprint (at most 384, the width of
    /// the stored fingerprint field)
    pub max_edid_bytes: usize,

    /// Separator between physical output name and split index
    pub name_separator: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        let defaults = MultiMonitorConfig::default();
        Self {
            edid_property: defaults.edid_property,
            max_edid_bytes: defaults.max_edid_bytes,
            name_separator: defaults.name_separator,
        }
    }
}

impl SynthesisConfig {
    /// Settings for the augmenter
    pub fn to_multimon_config(&self) -> MultiMonitorConfig {
        MultiMonitorConfig {
            edid_property: self.edid_property.clone(),
            max_edid_bytes: self.max_edid_bytes,
            name_separator: self.name_separator.clone(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    pub level: String,

    /// Log format ("pretty", "compact", "json")
    pub format: String,

    /// Also write logs to this file
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
            log_file: None,
        }
    }
}
