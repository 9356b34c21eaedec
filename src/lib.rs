use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod catalog;
pub mod watermark;

use watermark::{WatermarkError, WatermarkSettings};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub fonts: FontConfig,
    #[serde(default)]
    pub watermark: WatermarkSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

/// Where font faces are loaded from
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FontConfig {
    /// Load the fonts installed on the system
    pub load_system: bool,
    /// Extra directories scanned for font files
    pub directories: Vec<PathBuf>,
    /// Individual font files
    pub files: Vec<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "datestamp".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            load_system: true,
            directories: Vec::new(),
            files: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml_edit::de::Error),

    #[error(transparent)]
    InvalidSettings(#[from] WatermarkError),
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config = toml_edit::de::from_str::<Config>(content)?;
        config.watermark.validate()?;
        Ok(config)
    }

    /// Load `path`, or the defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml(&content)?;
            info!("Configuration loaded from: {:?}", path);
            Ok(config)
        } else {
            info!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }
}
