//! Rate Limit Module
//!
//! Per-principal admission control across four independent windows:
//!
//! - **Per-minute** and **per-hour** fixed windows for steady-state limits
//! - **Burst** window catching short spikes (e.g. 20 requests / 10 seconds)
//! - **Concurrent** in-flight semaphore, released explicitly per request
//!
//! The principal id is an opaque string (user id or IP address) supplied by
//! the caller's identification layer.
//!
//! # Example
//!
//! ```ignore
//! use proofgate::rate_limit::RateLimiter;
//!
//! let limiter = RateLimiter::with_defaults();
//! let decision = limiter.check("user-42").await;
//! if decision.allowed {
//!     // ... run the operation ...
//!     limiter.release("user-42").await;
//! }
//! ```

pub mod config;
pub mod limiter;

pub use config::{
    LimitOverrides, LimitSet, RateLimiterConfig, DEFAULT_BURST_WINDOW_SECS, DEFAULT_MAX_BURST,
    DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_PER_HOUR, DEFAULT_MAX_PER_MINUTE,
};
pub use limiter::{
    LimitType, PrincipalUsage, RateLimitDecision, RateLimiter, WindowRemaining, WindowResets,
};
