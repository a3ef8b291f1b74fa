//! Queued Request Types
//!
//! Types describing a single unit of work admitted into the request queue:
//! the operation itself, its priority and retry eligibility, and the
//! completion handle the caller awaits.

use crate::error::ProofGateError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Scheduling priority for a queued request
///
/// Lower rank is served first. Requests of equal priority are served in
/// enqueue order (FIFO).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Served before all other priorities
    High,
    /// Default priority
    Normal,
    /// Served only when no higher-priority work is queued
    Low,
}

impl Priority {
    /// Numeric rank of this priority (lower = served first)
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// Options controlling how a request is scheduled
///
/// Every recognized option is an explicit field with a default; there is no
/// open-ended option bag.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueOptions {
    /// Scheduling priority (default: normal)
    pub priority: Priority,

    /// Whether the request is eligible for automatic retry with backoff
    pub critical: bool,
}

impl EnqueueOptions {
    /// Options for a critical request at the given priority
    pub fn critical(priority: Priority) -> Self {
        Self {
            priority,
            critical: true,
        }
    }

    /// Options for a non-critical request at the given priority
    pub fn with_priority(priority: Priority) -> Self {
        Self {
            priority,
            critical: false,
        }
    }
}

/// A queued operation: a zero-argument factory producing one attempt future
///
/// The factory shape (rather than a single future) is what makes retry
/// possible: each retry calls the factory again for a fresh attempt.
pub type Operation<T> =
    Box<dyn FnMut() -> BoxFuture<'static, Result<T, anyhow::Error>> + Send + 'static>;

/// Box an async closure into an [`Operation`]
///
/// # Example
///
/// ```ignore
/// let op = operation(|| async { Ok(42u32) });
/// let handle = queue.enqueue(op, EnqueueOptions::default())?;
/// ```
pub fn operation<T, F, Fut>(mut f: F) -> Operation<T>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<T, anyhow::Error>> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

/// A request waiting in (or dispatched from) the queue
///
/// Created by `enqueue`, mutated only by the queue's own draining loop
/// (start time, retry count), and destroyed when it starts executing or is
/// cancelled via `clear`.
pub struct QueuedRequest<T> {
    /// Unique request id, used for log correlation
    pub id: Uuid,

    /// The operation to execute
    pub operation: Operation<T>,

    /// Scheduling priority
    pub priority: Priority,

    /// Whether this request is eligible for automatic retry
    pub critical: bool,

    /// When the request entered the queue
    pub enqueued_at: Instant,

    /// When the request was dispatched for execution
    pub started_at: Option<Instant>,

    /// Number of retries attempted so far
    pub retries: u32,

    /// Completion side of the caller's handle; single writer
    pub completion: oneshot::Sender<Result<T, ProofGateError>>,
}

impl<T> std::fmt::Debug for QueuedRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedRequest")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("critical", &self.critical)
            .field("retries", &self.retries)
            .finish()
    }
}

/// Handle the caller awaits for the outcome of a queued request
///
/// Single reader of the request's completion channel. Dropping the handle
/// abandons the result but does not cancel the operation.
#[derive(Debug)]
pub struct CompletionHandle<T> {
    id: Uuid,
    receiver: oneshot::Receiver<Result<T, ProofGateError>>,
}

impl<T> CompletionHandle<T> {
    pub(crate) fn new(id: Uuid, receiver: oneshot::Receiver<Result<T, ProofGateError>>) -> Self {
        Self { id, receiver }
    }

    /// The id of the request this handle belongs to
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Await the request's outcome
    ///
    /// Returns the operation's value, or the structured error the request
    /// settled with. A dropped sender is reported as a cancellation.
    pub async fn wait(self) -> Result<T, ProofGateError> {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(ProofGateError::Cancelled),
        }
    }
}

/// Read-only snapshot of queue state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Requests waiting in the queue (not yet started)
    pub queued_requests: usize,

    /// Operations currently executing
    pub active_operations: usize,

    /// Requests that have settled (including retry deferrals)
    pub total_processed: u64,

    /// Whether a drain pass currently owns the queue
    pub is_processing: bool,
}
