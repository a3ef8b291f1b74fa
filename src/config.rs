// Configuration File Support
//
// TOML configuration with environment variable overrides, loaded from the
// XDG config directory: ~/.config/proofgate/config.toml

use crate::queue::QueueConfig;
use crate::rate_limit::RateLimiterConfig;
use crate::router::RouterConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Request queue configuration
    pub queue: QueueConfig,

    /// Rate limiter configuration
    pub rate_limit: RateLimiterConfig,

    /// Execution router configuration
    pub router: RouterConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// If the config file does not exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or
    /// if the resulting configuration fails validation.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default().apply_env_overrides());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file from {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file from {:?}", path))?;

        let config = config.apply_env_overrides();
        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/proofgate/config.toml` on Linux/Mac
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "proofgate", "ProofGate") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".config")
                .join("proofgate")
                .join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - PROOFGATE_LOG_LEVEL, PROOFGATE_LOG_FORMAT
    /// - PROOFGATE_MAX_CONCURRENT, PROOFGATE_MAX_RETRIES
    /// - PROOFGATE_RATE_LIMIT_ENABLED, PROOFGATE_MAX_PER_MINUTE
    /// - PROOFGATE_REMOTE_URL, PROOFGATE_PROBE_TIMEOUT_SECS
    /// - PROOFGATE_EXECUTION_PREFERENCE
    fn apply_env_overrides(mut self) -> Self {
        // Logging overrides
        if let Ok(level) = std::env::var("PROOFGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("PROOFGATE_LOG_FORMAT") {
            self.logging.format = format;
        }

        // Queue overrides
        if let Ok(val) = std::env::var("PROOFGATE_MAX_CONCURRENT") {
            if let Ok(max) = val.parse::<usize>() {
                if max > 0 {
                    self.queue.max_concurrent = max;
                }
            }
        }
        if let Ok(val) = std::env::var("PROOFGATE_MAX_RETRIES") {
            if let Ok(max) = val.parse::<u32>() {
                if max <= 10 {
                    self.queue.max_retries = max;
                }
            }
        }
        if let Ok(val) = std::env::var("PROOFGATE_RETRY_BASE_DELAY_MS") {
            if let Ok(delay) = val.parse::<u64>() {
                if delay > 0 {
                    self.queue.retry_base_delay_ms = delay;
                }
            }
        }

        // Rate limit overrides
        if let Ok(val) = std::env::var("PROOFGATE_RATE_LIMIT_ENABLED") {
            self.rate_limit.enabled = val.parse().unwrap_or(self.rate_limit.enabled);
        }
        if let Ok(val) = std::env::var("PROOFGATE_MAX_PER_MINUTE") {
            if let Ok(limit) = val.parse() {
                self.rate_limit.max_per_minute = limit;
            }
        }
        if let Ok(val) = std::env::var("PROOFGATE_MAX_PER_HOUR") {
            if let Ok(limit) = val.parse() {
                self.rate_limit.max_per_hour = limit;
            }
        }
        if let Ok(val) = std::env::var("PROOFGATE_MAX_BURST") {
            if let Ok(limit) = val.parse() {
                self.rate_limit.max_burst = limit;
            }
        }

        // Router overrides
        if let Ok(url) = std::env::var("PROOFGATE_REMOTE_URL") {
            self.router.remote_base_url = url;
        }
        if let Ok(val) = std::env::var("PROOFGATE_PROBE_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                if secs > 0 {
                    self.router.probe_timeout_secs = secs;
                }
            }
        }
        if let Ok(val) = std::env::var("PROOFGATE_EXECUTION_PREFERENCE") {
            if let Ok(preference) = val.parse() {
                self.router.preference = preference;
            }
        }

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        // Validate logging level
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        // Validate logging format
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        // Validate queue configuration
        if self.queue.max_concurrent == 0 {
            anyhow::bail!("Queue max_concurrent must be > 0");
        }
        if self.queue.max_retries > 10 {
            anyhow::bail!("Queue max_retries must be <= 10");
        }

        // Validate rate limiter configuration
        if self.rate_limit.burst_window_secs == 0 {
            anyhow::bail!("Rate limit burst_window_secs must be > 0");
        }

        // Validate router configuration
        if self.router.remote_base_url.is_empty() {
            anyhow::bail!("Router remote_base_url must not be empty");
        }
        if !self.router.remote_base_url.starts_with("http://")
            && !self.router.remote_base_url.starts_with("https://")
        {
            anyhow::bail!(
                "Router remote_base_url must start with http:// or https://, got: {}",
                self.router.remote_base_url
            );
        }
        if self.router.probe_timeout_secs == 0 {
            anyhow::bail!("Router probe_timeout_secs must be > 0");
        }

        Ok(())
    }
}
