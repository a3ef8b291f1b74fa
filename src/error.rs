//! ProofGate Error Types
//!
//! This module defines the error taxonomy shared by the scheduler, the rate
//! limiter and the execution router.

use crate::rate_limit::LimitType;

/// Error types for admission, scheduling and routing operations
#[derive(Debug, thiserror::Error)]
pub enum ProofGateError {
    /// Bad caller input (invalid limit override, exceeded queue capacity)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Admission denied by the rate limiter
    ///
    /// Raised by the coordinator when a caller asked for execution; the
    /// limiter itself reports denial as a plain decision value so callers
    /// can inspect `retry_after_ms` without unwinding.
    #[error("Rate limit exceeded ({limit_type}): retry after {retry_after_ms}ms")]
    RateLimited {
        /// The first limit dimension that rejected the request
        limit_type: LimitType,
        /// Milliseconds until the rejecting window resets
        retry_after_ms: u64,
    },

    /// Request was cleared from the queue before it started executing
    #[error("Request cancelled before execution started")]
    Cancelled,

    /// The operation itself failed, after any eligible retries
    #[error("Operation failed after {retries} retries: {source}")]
    Execution {
        /// Number of retries that were attempted before giving up
        retries: u32,
        /// The operation's own terminal failure
        #[source]
        source: anyhow::Error,
    },

    /// The router found no viable execution backend
    #[error("No compatible execution backend: {0}")]
    Compatibility(String),
}

impl ProofGateError {
    /// Whether this error represents a rate-limit denial
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProofGateError::RateLimited { .. })
    }

    /// Whether this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProofGateError::Cancelled)
    }
}
