//! Rate limit configuration.

use crate::{RateLimitError, RateLimitErrorKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-caller sliding window settings.
///
/// # Examples
///
/// ```
/// use drawplus_rate_limit::RateLimitConfig;
///
/// let config = RateLimitConfig::default().with_max_requests(3).with_window_secs(10);
/// assert_eq!(*config.max_requests(), 3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct RateLimitConfig {
    /// Requests allowed per caller inside one window
    #[serde(default = "default_max_requests")]
    max_requests: u32,
    /// Length of the trailing window in seconds
    #[serde(default = "default_window_secs")]
    window_secs: u64,
    /// Minimum seconds between sweeps of idle callers
    #[serde(default = "default_cleanup_interval_secs")]
    cleanup_interval_secs: u64,
}

impl RateLimitConfig {
    /// Create a configuration with the default sweep interval.
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }

    /// The window as a duration.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// The sweep interval as a duration.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Reject configurations that would block every request or never expire.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when `max_requests` or `window_secs` is zero.
    pub fn validate(&self) -> Result<(), RateLimitError> {
        if self.max_requests == 0 {
            return Err(RateLimitError::new(RateLimitErrorKind::Config(
                "max_requests must be at least 1".to_string(),
            )));
        }
        if self.window_secs == 0 {
            return Err(RateLimitError::new(RateLimitErrorKind::Config(
                "window_secs must be at least 1".to_string(),
            )));
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_cleanup_interval_secs() -> u64 {
    300
}
