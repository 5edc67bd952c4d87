//! Configuration loading from TOML.
//!
//! Reads `config.toml` (or the path in `UVDASH_CONFIG`) and deserializes
//! into strongly-typed structs. Every section has defaults so a partial
//! file, or none at all in tests, still yields a usable configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "UVDASH_CONFIG";

/// When set, logs are emitted as JSON lines.
pub const LOG_JSON_ENV: &str = "UVDASH_LOG_JSON";

/// Hard ceiling on `past_days` imposed by the forecast provider.
pub const PROVIDER_MAX_LOOKBACK_DAYS: u32 = 92;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sources: SourcesConfig,
    pub history: HistoryConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8501 }
    }
}

/// Upstream endpoints and HTTP client settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    pub archive_url: String,
    pub forecast_url: String,
    pub indicators_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            archive_url: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            indicators_url: "https://mindicador.cl/api".to_string(),
            timeout_secs: 60,
            user_agent: "UVDASH/0.1.0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    /// Length of the default window when the caller gives no start date.
    pub default_days: u32,
    /// Lookback requested from the forecast source at most.
    /// Values above the provider ceiling are capped to it.
    pub max_lookback_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_days: 365,
            max_lookback_days: PROVIDER_MAX_LOOKBACK_DAYS,
        }
    }
}

impl HistoryConfig {
    /// Effective lookback ceiling, never above what the provider accepts.
    pub fn lookback_ceiling(&self) -> u32 {
        self.max_lookback_days.clamp(1, PROVIDER_MAX_LOOKBACK_DAYS)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_mins: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_mins: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Path to load from: `UVDASH_CONFIG` if set, otherwise `config.toml`.
    pub fn resolve_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }
}
