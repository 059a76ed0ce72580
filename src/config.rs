//! Configuration management for the Floodgate components.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::{FloodgateError, Result};
use crate::ratelimit::LimitConfig;

/// Main configuration for the Floodgate components.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloodgateConfig {
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Maximum requests allowed per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window duration in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

impl RateLimitingConfig {
    /// Build the validated per-check limit from this configuration.
    pub fn limit(&self) -> Result<LimitConfig> {
        LimitConfig::new(self.max_requests, Duration::from_secs(self.window_secs))
    }
}

/// Cache freshness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds a cached value is considered fresh
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// Seconds a stale value may still be served while a background
    /// refresh runs
    #[serde(default = "default_stale_secs")]
    pub stale_while_revalidate_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
            stale_while_revalidate_secs: default_stale_secs(),
        }
    }
}

fn default_max_age_secs() -> u64 {
    30
}

fn default_stale_secs() -> u64 {
    60
}

impl CacheConfig {
    /// Freshness window.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    /// Stale-serving window, clamped so it never ends before the
    /// freshness window.
    pub fn stale_window(&self) -> Duration {
        if self.stale_while_revalidate_secs < self.max_age_secs {
            warn!(
                max_age_secs = self.max_age_secs,
                stale_while_revalidate_secs = self.stale_while_revalidate_secs,
                "Stale window is shorter than max age, clamping to max age"
            );
        }
        Duration::from_secs(self.stale_while_revalidate_secs.max(self.max_age_secs))
    }
}

impl FloodgateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FloodgateConfig = serde_yaml::from_str(yaml)
            .map_err(|e| FloodgateError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would produce nonsensical windows.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limiting.window_secs == 0 {
            return Err(FloodgateError::Config(
                "rate_limiting.window_secs must be greater than zero".to_string(),
            ));
        }
        if self.rate_limiting.max_requests == 0 {
            return Err(FloodgateError::Config(
                "rate_limiting.max_requests must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
