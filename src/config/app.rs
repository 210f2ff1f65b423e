//! Main application configuration
//!
//! This module defines the primary configuration structures for the rating
//! service, including file and environment variable loading and validation.

use crate::config::rating::RatingConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub provider: ProviderSettings,
    pub storage: StorageSettings,
    pub rating: RatingConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Address the HTTP API binds to
    pub http_host: String,
    /// Port for the HTTP API, health and metrics
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Match data provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Base URL of The Blue Alliance API v3
    pub base_url: String,
    /// Value sent in the `X-TBA-Auth-Key` header
    pub auth_key: Option<String>,
    /// Minimum delay between consecutive requests in milliseconds
    pub request_delay_ms: u64,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

/// Snapshot persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Snapshot file used by save, load and recalculate
    pub data_path: PathBuf,
    /// Import the snapshot at startup when it exists
    pub load_on_startup: bool,
    /// Adopt the snapshot's environment when loading at startup
    pub use_env_from_snapshot: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "alliance-rating".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 5000,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.thebluealliance.com/api/v3".to_string(),
            auth_key: None,
            request_delay_ms: 100,
            timeout_seconds: 30,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("trueskill_data.json"),
            load_on_startup: true,
            use_env_from_snapshot: true,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", name, raw))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            self.service.http_host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            self.service.http_port = parse_var("HTTP_PORT", &port)?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = parse_var("SHUTDOWN_TIMEOUT_SECONDS", &timeout)?;
        }

        // Provider settings
        if let Ok(url) = env::var("TBA_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Ok(key) = env::var("TBA_AUTH_KEY") {
            self.provider.auth_key = Some(key).filter(|k| !k.trim().is_empty());
        }
        if let Ok(delay) = env::var("TBA_REQUEST_DELAY_MS") {
            self.provider.request_delay_ms = parse_var("TBA_REQUEST_DELAY_MS", &delay)?;
        }
        if let Ok(timeout) = env::var("TBA_TIMEOUT_SECONDS") {
            self.provider.timeout_seconds = parse_var("TBA_TIMEOUT_SECONDS", &timeout)?;
        }

        // Storage settings
        if let Ok(path) = env::var("RATING_DATA_PATH") {
            self.storage.data_path = PathBuf::from(path);
        }
        if let Ok(load) = env::var("RATING_LOAD_ON_STARTUP") {
            self.storage.load_on_startup = parse_var("RATING_LOAD_ON_STARTUP", &load)?;
        }

        // Rating environment
        if let Ok(mu) = env::var("RATING_MU") {
            self.rating.mu = parse_var("RATING_MU", &mu)?;
        }
        if let Ok(sigma) = env::var("RATING_SIGMA") {
            self.rating.sigma = parse_var("RATING_SIGMA", &sigma)?;
        }
        if let Ok(beta) = env::var("RATING_BETA") {
            self.rating.beta = parse_var("RATING_BETA", &beta)?;
        }
        if let Ok(tau) = env::var("RATING_TAU") {
            self.rating.tau = parse_var("RATING_TAU", &tau)?;
        }
        if let Ok(draw) = env::var("RATING_DRAW_PROBABILITY") {
            self.rating.draw_probability = parse_var("RATING_DRAW_PROBABILITY", &draw)?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get provider request timeout as Duration
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_seconds)
    }

    /// Get provider request pacing as Duration
    pub fn provider_request_delay(&self) -> Duration {
        Duration::from_millis(self.provider.request_delay_ms)
    }

    /// Socket address string for the HTTP listener
    pub fn http_bind_address(&self) -> String {
        format!("{}:{}", self.service.http_host, self.service.http_port)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.provider.timeout_seconds == 0 {
        return Err(anyhow!("Provider timeout must be greater than 0"));
    }

    // Validate provider settings
    if config.provider.base_url.trim().is_empty() {
        return Err(anyhow!("Provider base URL cannot be empty"));
    }

    // Validate storage settings
    if config.storage.data_path.as_os_str().is_empty() {
        return Err(anyhow!("Rating data path cannot be empty"));
    }

    // Validate rating environment
    config.rating.to_environment()?;

    Ok(())
}
