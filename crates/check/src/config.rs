//! Plugin configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use vinga_lib::provider::DEFAULT_API_RELEASE;

/// Settings that do not fit on a service definition's command line
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PluginConfig {
    /// Directory holding the per-provider counter caches
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// VI/JSON release used in request paths
    #[serde(default = "default_api_release")]
    pub api_release: String,

    /// Accept self-signed endpoint certificates
    #[serde(default)]
    pub insecure: bool,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_api_release() -> String {
    DEFAULT_API_RELEASE.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            api_release: default_api_release(),
            insecure: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PluginConfig {
    /// Load configuration from `VINGA_*` environment variables
    pub fn load() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix("VINGA"))
    }

    fn from_environment(environment: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()
            .context("Failed to read plugin configuration")?;

        config
            .try_deserialize()
            .context("Invalid plugin configuration")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
