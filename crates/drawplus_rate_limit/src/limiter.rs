//! Sliding-window request limiter keyed by caller identity.
//!
//! Each caller keeps a queue of request timestamps inside the trailing window.
//! Expired timestamps are dropped lazily whenever that caller is checked, and
//! callers whose whole history has expired are swept out at most once per
//! cleanup interval so long-running bots with many one-off callers stay bounded.

use crate::{RateLimitConfig, RateLimitError, RateLimitErrorKind};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, trace};

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateDecision {
    /// Whether the request was admitted (and recorded)
    allowed: bool,
    /// Whole seconds until a slot frees up; zero when allowed
    retry_after_secs: u64,
}

impl RateDecision {
    /// Whether the request was admitted.
    pub fn allowed(&self) -> bool {
        self.allowed
    }

    /// Whole seconds the caller should wait before retrying.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after_secs
    }

    /// An admitting decision.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            retry_after_secs: 0,
        }
    }

    /// A rejecting decision with the given retry delay.
    pub fn deny(retry_after_secs: u64) -> Self {
        Self {
            allowed: false,
            retry_after_secs,
        }
    }
}

#[derive(Debug)]
struct WindowState {
    config: RateLimitConfig,
    history: HashMap<String, VecDeque<Instant>>,
    last_cleanup: Instant,
}

impl WindowState {
    fn evict_expired(window: Duration, now: Instant, timestamps: &mut VecDeque<Instant>) {
        while let Some(oldest) = timestamps.front() {
            if now.duration_since(*oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn sweep(&mut self, now: Instant) -> usize {
        let window = self.config.window();
        let before = self.history.len();
        self.history.retain(|_, timestamps| {
            Self::evict_expired(window, now, timestamps);
            !timestamps.is_empty()
        });
        self.last_cleanup = now;
        before - self.history.len()
    }

    fn maybe_sweep(&mut self, now: Instant) {
        if now.duration_since(self.last_cleanup) >= self.config.cleanup_interval() {
            let removed = self.sweep(now);
            if removed > 0 {
                debug!(
                    removed,
                    remaining = self.history.len(),
                    "Swept idle rate limit callers"
                );
            }
        }
    }
}

/// Sliding-window rate limiter shared by every chat session.
///
/// All state sits behind one mutex that is held only for the in-memory update,
/// never across an await point.
///
/// # Example
///
/// ```
/// use drawplus_rate_limit::{RateLimitConfig, RateLimiter};
///
/// # #[tokio::main]
/// # async fn main() {
/// let limiter = RateLimiter::new(RateLimitConfig::new(2, 60));
///
/// assert!(limiter.check_and_record("group-1").allowed());
/// assert!(limiter.check_and_record("group-1").allowed());
///
/// let denied = limiter.check_and_record("group-1");
/// assert!(!denied.allowed());
/// assert!(denied.retry_after_secs() > 0);
///
/// // Other callers are unaffected
/// assert!(limiter.check_and_record("group-2").allowed());
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<WindowState>,
}

impl RateLimiter {
    /// Create a limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        debug!(
            max_requests = config.max_requests(),
            window_secs = config.window_secs(),
            "Creating rate limiter"
        );
        Self {
            state: Mutex::new(WindowState {
                config,
                history: HashMap::new(),
                last_cleanup: Instant::now(),
            }),
        }
    }

    /// Check whether `caller` may make a request now, recording it if so.
    ///
    /// A rejected attempt is not recorded, so hammering the limiter does not
    /// push the caller's window further out.
    #[instrument(skip(self))]
    pub fn check_and_record(&self, caller: &str) -> RateDecision {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.maybe_sweep(now);

        let window = state.config.window();
        let max_requests = *state.config.max_requests() as usize;
        let timestamps = state.history.entry(caller.to_string()).or_default();
        WindowState::evict_expired(window, now, timestamps);

        if timestamps.len() >= max_requests {
            let retry_after_secs = timestamps
                .front()
                .map(|oldest| retry_after(window, now.duration_since(*oldest)))
                .unwrap_or(1);
            debug!(
                count = timestamps.len(),
                max_requests, retry_after_secs, "Rate limit exceeded"
            );
            return RateDecision::deny(retry_after_secs);
        }

        timestamps.push_back(now);
        trace!(count = timestamps.len(), max_requests, "Request recorded");
        RateDecision::allow()
    }

    /// Like [`check_and_record`](Self::check_and_record), but as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns `LimitExceeded` carrying the retry delay when the caller is over
    /// its allowance.
    pub fn check(&self, caller: &str) -> Result<(), RateLimitError> {
        let decision = self.check_and_record(caller);
        if decision.allowed {
            Ok(())
        } else {
            Err(RateLimitError::new(RateLimitErrorKind::LimitExceeded {
                caller: caller.to_string(),
                retry_after_secs: decision.retry_after_secs,
            }))
        }
    }

    /// Replace the configuration, keeping every caller's history.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error and leaves the old settings in place if the
    /// new configuration is invalid.
    #[instrument(skip(self))]
    pub fn update_config(&self, config: RateLimitConfig) -> Result<(), RateLimitError> {
        config.validate()?;
        let mut state = self.state.lock();
        debug!(
            old_max = state.config.max_requests(),
            new_max = config.max_requests(),
            "Updating rate limit configuration"
        );
        state.config = config;
        Ok(())
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> RateLimitConfig {
        self.state.lock().config.clone()
    }

    /// Number of callers with history currently held in memory.
    pub fn tracked_callers(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Forget all history for one caller.
    pub fn reset(&self, caller: &str) {
        self.state.lock().history.remove(caller);
    }

    /// Remove every caller whose history has fully expired.
    ///
    /// Returns the number of callers removed.
    pub fn sweep(&self) -> usize {
        self.state.lock().sweep(Instant::now())
    }
}

/// Seconds until the oldest request leaves the window, rounded up.
fn retry_after(window: Duration, age: Duration) -> u64 {
    let remaining = window.saturating_sub(age);
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_rounds_up() {
        let window = Duration::from_secs(60);
        assert_eq!(retry_after(window, Duration::from_millis(500)), 60);
        assert_eq!(retry_after(window, Duration::from_secs(10)), 50);
        assert_eq!(retry_after(window, Duration::from_millis(59_001)), 1);
    }

    #[test]
    fn test_retry_after_never_zero() {
        assert_eq!(
            retry_after(Duration::from_secs(60), Duration::from_secs(61)),
            1
        );
    }
}
