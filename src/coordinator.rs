//! Coordinator
//!
//! Composition root wiring the execution router, the rate limiter and the
//! request queue together. A caller asks for an operation to be executed;
//! the router supplies the session's backend mode, the limiter admits or
//! denies, and the queue schedules and retries. The limiter's concurrent
//! slot is released exactly once per admitted request, whatever the
//! outcome.
//!
//! All three components are injected as constructed service objects; there
//! are no module-level globals, so tests and embedders can run multiple
//! independent schedulers.

use crate::config::Config;
use crate::error::ProofGateError;
use crate::queue::{CompletionHandle, EnqueueOptions, Operation, QueueStatus, RequestQueue};
use crate::rate_limit::{LimitOverrides, LimitType, RateLimitDecision, RateLimiter};
use crate::router::{ExecutionContext, ExecutionMode, ExecutionRouter};
use serde::{Deserialize, Serialize};

/// Combined status snapshot for a scheduler
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerStatus {
    /// Queue state
    pub queue: QueueStatus,

    /// Resolved execution mode, if initialization has happened
    pub mode: Option<ExecutionMode>,

    /// Wall-clock time the snapshot was taken
    pub as_of: chrono::DateTime<chrono::Utc>,
}

/// Admission-controlled scheduler for proof operations
pub struct ProofScheduler<T: Send + 'static> {
    router: ExecutionRouter,
    limiter: RateLimiter,
    queue: RequestQueue<T>,
}

impl<T: Send + 'static> Clone for ProofScheduler<T> {
    fn clone(&self) -> Self {
        Self {
            router: self.router.clone(),
            limiter: self.limiter.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<T: Send + 'static> ProofScheduler<T> {
    /// Create a scheduler from constructed components
    pub fn new(router: ExecutionRouter, limiter: RateLimiter, queue: RequestQueue<T>) -> Self {
        Self {
            router,
            limiter,
            queue,
        }
    }

    /// Create a scheduler from configuration
    ///
    /// Uses the host capability detector and the HTTP status probe.
    pub fn from_config(config: &Config) -> Result<Self, ProofGateError> {
        let router = ExecutionRouter::from_config(&config.router)?;
        let limiter = RateLimiter::new(config.rate_limit.clone());
        let queue = RequestQueue::new(config.queue.clone());
        Ok(Self::new(router, limiter, queue))
    }

    /// Resolve the execution mode for this session
    ///
    /// Must succeed before any operation is scheduled; a compatibility
    /// failure here is fatal to initialization.
    pub async fn initialize(&self) -> Result<ExecutionContext, ProofGateError> {
        self.router.initialize().await
    }

    /// Re-resolve the execution mode, discarding a previous resolution
    pub async fn reinitialize(&self) -> Result<ExecutionContext, ProofGateError> {
        self.router.initialize_with(true).await
    }

    /// Execute an operation on behalf of `principal`
    ///
    /// Admission, scheduling and release in one call: the limiter admits or
    /// denies; on admission the operation is enqueued and its handle
    /// awaited; the limiter's concurrent slot is released exactly once when
    /// the request settles, including on failure and cancellation.
    pub async fn execute(
        &self,
        principal: &str,
        operation: Operation<T>,
        options: EnqueueOptions,
    ) -> Result<T, ProofGateError> {
        let handle = self.submit(principal, operation, options).await?;
        let result = handle.wait().await;
        self.limiter.release(principal).await;
        result
    }

    /// Admit and enqueue an operation, returning its completion handle
    ///
    /// The caller owns the release half of the admission: after awaiting
    /// the handle (or abandoning it), call [`ProofScheduler::release`] for
    /// the same principal exactly once. Most callers want
    /// [`ProofScheduler::execute`], which does this bookkeeping itself.
    pub async fn submit(
        &self,
        principal: &str,
        operation: Operation<T>,
        options: EnqueueOptions,
    ) -> Result<CompletionHandle<T>, ProofGateError> {
        if !self.router.is_initialized().await {
            self.router.initialize().await?;
        }

        let decision = self.limiter.check(principal).await;
        if !decision.allowed {
            return Err(ProofGateError::RateLimited {
                limit_type: decision.limit_type.unwrap_or(LimitType::PerMinute),
                retry_after_ms: decision.retry_after_ms.unwrap_or(0),
            });
        }

        match self.queue.enqueue(operation, options) {
            Ok(handle) => Ok(handle),
            Err(err) => {
                // Admission already incremented the in-flight counter.
                self.limiter.release(principal).await;
                Err(err)
            }
        }
    }

    /// Release the concurrent slot acquired by a successful [`submit`]
    ///
    /// [`submit`]: ProofScheduler::submit
    pub async fn release(&self, principal: &str) {
        self.limiter.release(principal).await;
    }

    /// Check admission for `principal` without scheduling anything
    pub async fn check_rate_limit(&self, principal: &str) -> RateLimitDecision {
        self.limiter.check(principal).await
    }

    /// Apply per-principal limit overrides
    pub async fn set_principal_limits(
        &self,
        principal: &str,
        overrides: &LimitOverrides,
    ) -> Result<(), ProofGateError> {
        self.limiter.set_principal_limits(principal, overrides).await
    }

    /// Cancel every queued (not yet started) request
    pub async fn cancel_pending(&self) -> usize {
        self.queue.clear()
    }

    /// Combined status snapshot
    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            queue: self.queue.status(),
            mode: self.router.mode().await,
            as_of: chrono::Utc::now(),
        }
    }

    /// The underlying rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The underlying request queue
    pub fn queue(&self) -> &RequestQueue<T> {
        &self.queue
    }

    /// The underlying execution router
    pub fn router(&self) -> &ExecutionRouter {
        &self.router
    }
}
