// Configuration save/restore functionality

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const CONFIG_DIR: &str = "wirewatch";
const CONFIG_FILE: &str = "config.json";

/// Persisted user defaults. Command-line arguments always win over these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default interface to monitor
    #[serde(default)]
    pub interface: Option<String>,

    /// Default aggregation interval in milliseconds
    #[serde(default)]
    pub interval_ms: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("could not determine user config directory")?;
        let config_dir = base.join(CONFIG_DIR);

        fs::create_dir_all(&config_dir)
            .with_context(|| format!("failed to create config directory: {:?}", config_dir))?;

        Ok(config_dir.join(CONFIG_FILE))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            log::debug!("config file not found, using defaults");
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {:?}", path))?;

        let config: Config =
            serde_json::from_str(&contents).context("failed to parse config file")?;

        log::info!("loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        let contents = serde_json::to_string_pretty(self).context("failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("failed to write config file: {:?}", path))?;

        log::info!("saved configuration to {:?}", path);
        Ok(())
    }
}
