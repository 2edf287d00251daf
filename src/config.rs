use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::session::SessionTiming;

// Embed default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../defaults/config.toml");

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_message_settle_ms")]
    pub message_settle_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: None,
            settle_ms: default_settle_ms(),
            message_settle_ms: default_message_settle_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
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

fn default_settle_ms() -> u64 {
    600
}

fn default_message_settle_ms() -> u64 {
    800
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load `<data dir>/config.toml`, writing the default file on first run
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::extract_defaults(data_dir)?;
        Self::load_from_file(&Self::config_path(data_dir))
    }

    /// Load config from a custom file path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).context(format!("Failed to read config file: {:?}", path))?;
        let config: Config =
            toml::from_str(&contents).context(format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Create the data directory and the default config.toml (idempotent)
    fn extract_defaults(data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)
            .context(format!("Failed to create data directory: {:?}", data_dir))?;

        let config_path = Self::config_path(data_dir);
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG).context("Failed to write config.toml")?;
            tracing::info!("Extracted config.toml to {:?}", config_path);
        }

        Ok(())
    }

    pub fn timing(&self) -> SessionTiming {
        SessionTiming {
            export_settle: Duration::from_millis(self.export.settle_ms),
            message_settle: Duration::from_millis(self.export.message_settle_ms),
        }
    }

    /// Export directory from config, or `<data dir>/exports`
    pub fn export_dir(&self, data_dir: &Path) -> PathBuf {
        self.export
            .directory
            .clone()
            .unwrap_or_else(|| data_dir.join("exports"))
    }

    /// Get the base glowsnap directory (~/.glowsnap/)
    /// Can be overridden with GLOWSNAP_DIR environment variable
    pub fn base_dir() -> Result<PathBuf> {
        if let Ok(custom_dir) = std::env::var("GLOWSNAP_DIR") {
            return Ok(PathBuf::from(custom_dir));
        }

        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".glowsnap"))
    }

    /// Returns: <data dir>/config.toml
    pub fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join("config.toml")
    }

    /// Returns: <data dir>/glowsnap.log
    pub fn log_path(data_dir: &Path) -> PathBuf {
        data_dir.join("glowsnap.log")
    }

    /// Key-value store directory for themes, history and the CLI image slot
    /// Returns: <data dir>/store/
    pub fn store_dir(data_dir: &Path) -> PathBuf {
        data_dir.join("store")
    }
}
