//! Configuration management for recordify

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::reader::ReaderSettings;

pub mod recording;

pub use recording::{CaptureMode, CaptureQuality, OutputFormat, RecordingConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Reader polling and tracking
    #[serde(default)]
    pub reader: ReaderSettings,

    /// Default recording session
    #[serde(default)]
    pub recording: RecordingConfig,

    /// Where presets, scripts and annotations are kept
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when RECORDIFY_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for file-backed storage
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// Key prefix for recording presets
    #[serde(default = "default_preset_dir")]
    pub preset_dir: String,

    /// Key of the recorded action script
    #[serde(default = "default_action_script")]
    pub action_script: String,

    /// Key prefix for annotations persisted at session end
    #[serde(default = "default_annotation_export")]
    pub annotation_export: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            preset_dir: default_preset_dir(),
            action_script: default_action_script(),
            annotation_export: default_annotation_export(),
        }
    }
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl Config {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(format!("Unknown log level '{}'", self.logging.level).into());
        }

        self.reader.validate()?;

        if let Err(msg) = self.recording.validate() {
            return Err(format!("Invalid [recording] section: {}", msg).into());
        }

        for (name, value) in [
            ("preset_dir", &self.storage.preset_dir),
            ("action_script", &self.storage.action_script),
            ("annotation_export", &self.storage.annotation_export),
        ] {
            if value.trim().is_empty() {
                return Err(format!("Storage {} must not be empty", name).into());
            }
        }

        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("recordify-data")
}

fn default_preset_dir() -> String {
    "presets".to_string()
}

fn default_action_script() -> String {
    "scripts/actions.json".to_string()
}

fn default_annotation_export() -> String {
    "annotations".to_string()
}
