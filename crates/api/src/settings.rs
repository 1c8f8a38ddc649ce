//! Layered settings: defaults, then `home-monitor.toml`, then `HOME_MONITOR__*` env vars

use config::{Config, ConfigError, Environment, File};
use monitor::MonitorConfig;
use serde::Deserialize;
use std::path::PathBuf;
use vision_classifier::ClassifierConfig;

use crate::rate_limit::RateLimitConfig;

/// Settings file name (extension resolved by the `config` crate)
pub const SETTINGS_FILE: &str = "home-monitor";
/// Environment variable prefix, e.g. `HOME_MONITOR__SERVER__BIND`
pub const ENV_PREFIX: &str = "HOME_MONITOR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub monitor: MonitorConfig,
    pub classifier: ClassifierConfig,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address
    pub bind: String,
    /// Clip files named in source requests are resolved under this directory
    pub media_dir: PathBuf,
    /// Limits for the control (POST) routes
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            media_dir: PathBuf::from("media"),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Settings {
    /// Load from the working directory and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(SETTINGS_FILE)
    }

    /// Load with an explicit settings file (missing file is fine)
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
