//! Configuration loading and validation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for the web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory of static files for the display client
    #[serde(default = "default_web_root")]
    pub web_root: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            web_root: default_web_root(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5002".to_string()
}

fn default_web_root() -> String {
    "web".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the known-device table
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> String {
    "./known_devices.csv".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Location used when a lookup fails or none is given
    #[serde(default = "default_fallback_location")]
    pub fallback_location: String,
    /// How long a fetched report stays fresh, in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Days of forecast to request
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            fallback_location: default_fallback_location(),
            cache_ttl_secs: default_cache_ttl(),
            forecast_days: default_forecast_days(),
        }
    }
}

fn default_fallback_location() -> String {
    "London".to_string()
}

fn default_cache_ttl() -> u64 {
    1800 // 30 minutes
}

fn default_forecast_days() -> u8 {
    5
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
