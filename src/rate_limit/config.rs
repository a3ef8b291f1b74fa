//! Rate Limit Configuration
//!
//! Default ceilings, per-principal limit sets, and override structs for the
//! four-window rate limiter.

use serde::{Deserialize, Serialize};

/// Default per-minute request ceiling
pub const DEFAULT_MAX_PER_MINUTE: u32 = 10;

/// Default per-hour request ceiling
pub const DEFAULT_MAX_PER_HOUR: u32 = 100;

/// Default burst ceiling (requests per burst window)
pub const DEFAULT_MAX_BURST: u32 = 20;

/// Default burst window length in seconds
pub const DEFAULT_BURST_WINDOW_SECS: u64 = 10;

/// Default concurrent in-flight ceiling
pub const DEFAULT_MAX_CONCURRENT: u32 = 3;

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Enable rate limiting; when disabled every check is allowed
    pub enabled: bool,

    /// Requests allowed per minute, per principal
    pub max_per_minute: u32,

    /// Requests allowed per hour, per principal
    pub max_per_hour: u32,

    /// Requests allowed per burst window, per principal
    pub max_burst: u32,

    /// Burst window length in seconds
    pub burst_window_secs: u64,

    /// Concurrent in-flight requests allowed per principal
    pub max_concurrent: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_per_minute: DEFAULT_MAX_PER_MINUTE,
            max_per_hour: DEFAULT_MAX_PER_HOUR,
            max_burst: DEFAULT_MAX_BURST,
            burst_window_secs: DEFAULT_BURST_WINDOW_SECS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl RateLimiterConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable rate limiting (for testing)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// The default limit set newly seen principals start with
    pub fn limit_set(&self) -> LimitSet {
        LimitSet {
            max_per_minute: self.max_per_minute,
            max_per_hour: self.max_per_hour,
            max_burst: self.max_burst,
            burst_window_secs: self.burst_window_secs,
            max_concurrent: self.max_concurrent,
        }
    }
}

/// Effective ceilings for a single principal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LimitSet {
    /// Requests allowed per minute
    pub max_per_minute: u32,

    /// Requests allowed per hour
    pub max_per_hour: u32,

    /// Requests allowed per burst window
    pub max_burst: u32,

    /// Burst window length in seconds
    pub burst_window_secs: u64,

    /// Concurrent in-flight requests allowed
    pub max_concurrent: u32,
}

/// Per-principal limit overrides
///
/// Every recognized field is explicit; absent fields leave the current value
/// unchanged. Each provided field is validated before assignment.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitOverrides {
    /// Override for the per-minute ceiling
    pub max_per_minute: Option<u32>,

    /// Override for the per-hour ceiling
    pub max_per_hour: Option<u32>,

    /// Override for the burst ceiling
    pub max_burst: Option<u32>,

    /// Override for the burst window length (seconds, must be > 0)
    pub burst_window_secs: Option<u64>,

    /// Override for the concurrent in-flight ceiling
    pub max_concurrent: Option<u32>,
}

impl LimitOverrides {
    /// Whether no override field was provided
    pub fn is_empty(&self) -> bool {
        self.max_per_minute.is_none()
            && self.max_per_hour.is_none()
            && self.max_burst.is_none()
            && self.burst_window_secs.is_none()
            && self.max_concurrent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimiterConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_per_minute, DEFAULT_MAX_PER_MINUTE);
        assert_eq!(config.max_per_hour, DEFAULT_MAX_PER_HOUR);
        assert_eq!(config.max_burst, DEFAULT_MAX_BURST);
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
    }

    #[test]
    fn test_disabled_config() {
        let config = RateLimiterConfig::disabled();
        assert!(!config.enabled);
    }

    #[test]
    fn test_limit_set_mirrors_config() {
        let config = RateLimiterConfig {
            max_per_minute: 5,
            ..RateLimiterConfig::default()
        };
        let limits = config.limit_set();
        assert_eq!(limits.max_per_minute, 5);
        assert_eq!(limits.max_per_hour, DEFAULT_MAX_PER_HOUR);
    }

    #[test]
    fn test_overrides_is_empty() {
        assert!(LimitOverrides::default().is_empty());
        let overrides = LimitOverrides {
            max_burst: Some(50),
            ..LimitOverrides::default()
        };
        assert!(!overrides.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = RateLimiterConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RateLimiterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }
}
