//! Configuration management for the setup CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vinga_lib::DefaultThresholds;

/// Setup defaults read from `~/.config/vinga/config.json`
///
/// Command-line flags take precedence over every value here.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub port: Option<u16>,
    pub user: Option<String>,
    /// Directory the generated object files are written to
    pub output_dir: Option<PathBuf>,
    pub domain_suffix: Option<String>,
    /// Plugin path baked into the command definition
    pub plugin_path: Option<String>,
    pub host_template: Option<String>,
    pub service_template: Option<String>,
    pub api_release: Option<String>,
    pub insecure: Option<bool>,
    pub thresholds: DefaultThresholds,
}

impl Config {
    /// Load configuration from the default location, if present
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("vinga").join("config.json"))
    }
}
