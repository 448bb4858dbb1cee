//! Configuration
//!
//! TigerStyle: Defaults are named constants; the environment may override
//! them and every source goes through `validate`.

use serde::{Deserialize, Serialize};

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Lower bound of injected latency (inclusive)
pub const LATENCY_MS_MIN_DEFAULT: u64 = 200;

/// Upper bound of injected latency (exclusive)
pub const LATENCY_MS_MAX_DEFAULT: u64 = 1000;

/// A draw above this value fails the call
pub const FAILURE_THRESHOLD_DEFAULT: f64 = 0.75;

/// Environment variable for the latency lower bound
pub const ENV_LATENCY_MS_MIN: &str = "ROLEDESK_LATENCY_MS_MIN";

/// Environment variable for the latency upper bound
pub const ENV_LATENCY_MS_MAX: &str = "ROLEDESK_LATENCY_MS_MAX";

/// Environment variable for the failure threshold
pub const ENV_FAILURE_THRESHOLD: &str = "ROLEDESK_FAILURE_THRESHOLD";

// =============================================================================
// Unreliable Config
// =============================================================================

/// Latency and failure injection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnreliableConfig {
    /// Minimum injected latency in milliseconds
    pub latency_ms_min: u64,
    /// Maximum injected latency in milliseconds (exclusive)
    pub latency_ms_max: u64,
    /// Calls whose failure draw exceeds this are rejected
    pub failure_threshold: f64,
}

impl Default for UnreliableConfig {
    fn default() -> Self {
        Self {
            latency_ms_min: LATENCY_MS_MIN_DEFAULT,
            latency_ms_max: LATENCY_MS_MAX_DEFAULT,
            failure_threshold: FAILURE_THRESHOLD_DEFAULT,
        }
    }
}

impl UnreliableConfig {
    /// No latency and no injected failures
    pub fn reliable() -> Self {
        Self {
            latency_ms_min: 0,
            latency_ms_max: 0,
            failure_threshold: 1.0,
        }
    }

    /// Defaults overridden by `ROLEDESK_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns per variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_LATENCY_MS_MIN) {
            config.latency_ms_min = parse_var(ENV_LATENCY_MS_MIN, &raw)?;
        }
        if let Some(raw) = lookup(ENV_LATENCY_MS_MAX) {
            config.latency_ms_max = parse_var(ENV_LATENCY_MS_MAX, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FAILURE_THRESHOLD) {
            config.failure_threshold = parse_var(ENV_FAILURE_THRESHOLD, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the wrapper relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.latency_ms_min > self.latency_ms_max {
            return Err(ConfigError::LatencyRange {
                min: self.latency_ms_min,
                max: self.latency_ms_max,
            });
        }
        if !(0.0..=1.0).contains(&self.failure_threshold) {
            return Err(ConfigError::FailureThreshold(self.failure_threshold));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

// =============================================================================
// Errors
// =============================================================================

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("latency range is empty: min {min}ms > max {max}ms")]
    LatencyRange { min: u64, max: u64 },

    #[error("failure threshold must be within [0, 1], got {0}")]
    FailureThreshold(f64),
}

// =============================================================================
// Tests
// =============================================================================
