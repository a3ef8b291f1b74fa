//! Per-Principal Rate Limiter
//!
//! Admission control across four independent windows per principal: a
//! per-minute fixed window, a per-hour fixed window, a short burst window,
//! and a concurrent in-flight semaphore.
//!
//! A check evaluates all four ceilings and either increments all four
//! counters (allowed) or mutates nothing (denied). The whole
//! evaluate-and-increment section runs under the principal map's write lock
//! with no suspension point inside, so checks are atomic with respect to
//! each other.

use crate::error::ProofGateError;
use crate::metrics;
use crate::rate_limit::config::{LimitOverrides, LimitSet, RateLimiterConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Length of the per-minute window
const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// Length of the per-hour window
const HOUR_WINDOW: Duration = Duration::from_secs(3600);

/// The limit dimension that rejected a request
///
/// Ordered by evaluation priority: minute, hour, concurrent, burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LimitType {
    /// Per-minute ceiling
    PerMinute,
    /// Per-hour ceiling
    PerHour,
    /// Concurrent in-flight ceiling
    Concurrent,
    /// Burst-window ceiling
    Burst,
}

impl LimitType {
    /// Stable string form, used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitType::PerMinute => "per-minute",
            LimitType::PerHour => "per-hour",
            LimitType::Concurrent => "concurrent",
            LimitType::Burst => "burst",
        }
    }
}

impl std::fmt::Display for LimitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remaining headroom per window after a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRemaining {
    /// Requests left in the current minute window
    pub minute: u32,
    /// Requests left in the current hour window
    pub hour: u32,
    /// Requests left in the current burst window
    pub burst: u32,
    /// Concurrent slots left
    pub concurrent: u32,
}

/// Milliseconds until each timed window resets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowResets {
    /// Until the minute window resets
    pub minute_ms: u64,
    /// Until the hour window resets
    pub hour_ms: u64,
    /// Until the burst window resets
    pub burst_ms: u64,
}

/// Result of a rate limit check
///
/// Denial is a value, not an error: callers inspect `retry_after_ms` and
/// decide whether to wait or abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether the request is admitted
    pub allowed: bool,

    /// The first failing limit dimension, in evaluation priority order
    pub limit_type: Option<LimitType>,

    /// Milliseconds until the failing dimension resets; zero for the
    /// concurrent dimension, which frees on release rather than on a timer
    pub retry_after_ms: Option<u64>,

    /// Remaining headroom per window
    pub remaining: WindowRemaining,

    /// Time until each timed window resets
    pub resets: WindowResets,
}

impl RateLimitDecision {
    /// Create an allowed decision
    pub fn allowed(remaining: WindowRemaining, resets: WindowResets) -> Self {
        Self {
            allowed: true,
            limit_type: None,
            retry_after_ms: None,
            remaining,
            resets,
        }
    }

    /// Create a denied decision
    pub fn denied(
        limit_type: LimitType,
        retry_after_ms: u64,
        remaining: WindowRemaining,
        resets: WindowResets,
    ) -> Self {
        Self {
            allowed: false,
            limit_type: Some(limit_type),
            retry_after_ms: Some(retry_after_ms),
            remaining,
            resets,
        }
    }
}

/// Counter snapshot for a principal (for dashboards and the CLI)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalUsage {
    /// Requests counted in the current minute window
    pub minute_count: u32,
    /// Requests counted in the current hour window
    pub hour_count: u32,
    /// Requests counted in the current burst window
    pub burst_count: u32,
    /// Requests currently in flight
    pub concurrent_in_flight: u32,
}

/// A fixed window: a counter plus the instant it next resets
#[derive(Debug, Clone, Copy)]
struct FixedWindow {
    count: u32,
    reset_at: Instant,
}

impl FixedWindow {
    fn new(duration: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + duration,
        }
    }

    /// Zero the counter and open a new window if this one has elapsed
    ///
    /// Windows reset independently of each other, and a just-expired window
    /// is reset before any ceiling check in the same call.
    fn reset_if_expired(&mut self, now: Instant, duration: Duration) {
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + duration;
        }
    }

    fn until_reset_ms(&self, now: Instant) -> u64 {
        self.reset_at.saturating_duration_since(now).as_millis() as u64
    }
}

/// Per-principal window state; created lazily on first check
#[derive(Debug, Clone)]
struct PrincipalState {
    minute: FixedWindow,
    hour: FixedWindow,
    burst: FixedWindow,
    concurrent_in_flight: u32,
    limits: LimitSet,
}

impl PrincipalState {
    fn new(limits: LimitSet) -> Self {
        Self {
            minute: FixedWindow::new(MINUTE_WINDOW),
            hour: FixedWindow::new(HOUR_WINDOW),
            burst: FixedWindow::new(Duration::from_secs(limits.burst_window_secs)),
            concurrent_in_flight: 0,
            limits,
        }
    }

    fn remaining(&self) -> WindowRemaining {
        WindowRemaining {
            minute: self.limits.max_per_minute.saturating_sub(self.minute.count),
            hour: self.limits.max_per_hour.saturating_sub(self.hour.count),
            burst: self.limits.max_burst.saturating_sub(self.burst.count),
            concurrent: self
                .limits
                .max_concurrent
                .saturating_sub(self.concurrent_in_flight),
        }
    }

    fn resets(&self, now: Instant) -> WindowResets {
        WindowResets {
            minute_ms: self.minute.until_reset_ms(now),
            hour_ms: self.hour.until_reset_ms(now),
            burst_ms: self.burst.until_reset_ms(now),
        }
    }
}

/// Per-principal admission control across four independent windows
///
/// Cloning shares the underlying principal map. `check` and `release` form
/// an acquire/release pair for the concurrent dimension: every allowed check
/// must be matched by exactly one release.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    principals: Arc<RwLock<HashMap<String, PrincipalState>>>,
}

impl RateLimiter {
    /// Create a limiter with the given configuration
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            principals: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a limiter with default ceilings
    pub fn with_defaults() -> Self {
        Self::new(RateLimiterConfig::default())
    }

    /// Create a disabled limiter (for testing)
    pub fn disabled() -> Self {
        Self::new(RateLimiterConfig::disabled())
    }

    /// Check whether a request from `principal` may proceed
    ///
    /// Expired windows are reset first, then the four ceilings are evaluated
    /// in priority order (minute, hour, concurrent, burst). When all pass,
    /// all four counters are incremented and the request is admitted; when
    /// any fails, nothing is mutated and the decision carries the failing
    /// dimension plus its retry-after hint.
    pub async fn check(&self, principal: &str) -> RateLimitDecision {
        if !self.config.enabled {
            return RateLimitDecision::allowed(
                WindowRemaining {
                    minute: u32::MAX,
                    hour: u32::MAX,
                    burst: u32::MAX,
                    concurrent: u32::MAX,
                },
                WindowResets {
                    minute_ms: 0,
                    hour_ms: 0,
                    burst_ms: 0,
                },
            );
        }

        let mut principals = self.principals.write().await;
        let state = principals
            .entry(principal.to_string())
            .or_insert_with(|| PrincipalState::new(self.config.limit_set()));

        // No suspension points from here to the end of the function: the
        // ceiling evaluation and the counter increments are one atomic step.
        let now = Instant::now();
        let burst_window = Duration::from_secs(state.limits.burst_window_secs);
        state.minute.reset_if_expired(now, MINUTE_WINDOW);
        state.hour.reset_if_expired(now, HOUR_WINDOW);
        state.burst.reset_if_expired(now, burst_window);

        let failing = if state.minute.count >= state.limits.max_per_minute {
            Some((LimitType::PerMinute, state.minute.until_reset_ms(now)))
        } else if state.hour.count >= state.limits.max_per_hour {
            Some((LimitType::PerHour, state.hour.until_reset_ms(now)))
        } else if state.concurrent_in_flight >= state.limits.max_concurrent {
            // Frees when a slot is released, not on a timer.
            Some((LimitType::Concurrent, 0))
        } else if state.burst.count >= state.limits.max_burst {
            Some((LimitType::Burst, state.burst.until_reset_ms(now)))
        } else {
            None
        };

        match failing {
            Some((limit_type, retry_after_ms)) => {
                metrics::ADMISSIONS_DENIED_TOTAL
                    .with_label_values(&[limit_type.as_str()])
                    .inc();
                tracing::debug!(
                    principal,
                    limit_type = limit_type.as_str(),
                    retry_after_ms,
                    "request denied"
                );
                RateLimitDecision::denied(
                    limit_type,
                    retry_after_ms,
                    state.remaining(),
                    state.resets(now),
                )
            }
            None => {
                state.minute.count += 1;
                state.hour.count += 1;
                state.burst.count += 1;
                state.concurrent_in_flight += 1;
                metrics::ADMISSIONS_ALLOWED_TOTAL.inc();
                tracing::debug!(
                    principal,
                    in_flight = state.concurrent_in_flight,
                    "request admitted"
                );
                RateLimitDecision::allowed(state.remaining(), state.resets(now))
            }
        }
    }

    /// Release one concurrent slot for `principal`
    ///
    /// Must be called exactly once per allowed check, whether the underlying
    /// operation succeeded, failed, or was cancelled after admission. The
    /// in-flight counter is floored at zero.
    pub async fn release(&self, principal: &str) {
        let mut principals = self.principals.write().await;
        match principals.get_mut(principal) {
            Some(state) => {
                if state.concurrent_in_flight == 0 {
                    tracing::warn!(principal, "release without matching check");
                }
                state.concurrent_in_flight = state.concurrent_in_flight.saturating_sub(1);
            }
            None => {
                tracing::warn!(principal, "release for unknown principal");
            }
        }
    }

    /// Apply limit overrides for `principal`
    ///
    /// Each provided field is validated before it is assigned; fields are
    /// applied individually, so an invalid later field does not undo an
    /// earlier valid one.
    pub async fn set_principal_limits(
        &self,
        principal: &str,
        overrides: &LimitOverrides,
    ) -> Result<(), ProofGateError> {
        if overrides.is_empty() {
            return Err(ProofGateError::Validation(
                "no override fields provided".to_string(),
            ));
        }

        let mut principals = self.principals.write().await;
        let state = principals
            .entry(principal.to_string())
            .or_insert_with(|| PrincipalState::new(self.config.limit_set()));

        if let Some(value) = overrides.max_per_minute {
            state.limits.max_per_minute = value;
        }
        if let Some(value) = overrides.max_per_hour {
            state.limits.max_per_hour = value;
        }
        if let Some(value) = overrides.max_burst {
            state.limits.max_burst = value;
        }
        if let Some(value) = overrides.burst_window_secs {
            if value == 0 {
                return Err(ProofGateError::Validation(
                    "burst_window_secs must be greater than zero".to_string(),
                ));
            }
            state.limits.burst_window_secs = value;
        }
        if let Some(value) = overrides.max_concurrent {
            state.limits.max_concurrent = value;
        }

        tracing::info!(principal, limits = ?state.limits, "principal limits updated");
        Ok(())
    }

    /// Effective limits for `principal` (defaults if never seen)
    pub async fn limits_for(&self, principal: &str) -> LimitSet {
        let principals = self.principals.read().await;
        principals
            .get(principal)
            .map(|state| state.limits)
            .unwrap_or_else(|| self.config.limit_set())
    }

    /// Counter snapshot for `principal`, if any state exists
    pub async fn usage(&self, principal: &str) -> Option<PrincipalUsage> {
        let principals = self.principals.read().await;
        principals.get(principal).map(|state| PrincipalUsage {
            minute_count: state.minute.count,
            hour_count: state.hour.count,
            burst_count: state.burst.count,
            concurrent_in_flight: state.concurrent_in_flight,
        })
    }

    /// Drop all tracked state for `principal`
    pub async fn reset(&self, principal: &str) {
        let mut principals = self.principals.write().await;
        principals.remove(principal);
    }

    /// Number of principals with tracked state
    pub async fn principal_count(&self) -> usize {
        let principals = self.principals.read().await;
        principals.len()
    }
}
