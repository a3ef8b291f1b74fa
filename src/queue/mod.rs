//! Request Queue Module
//!
//! Priority-ordered, bounded-concurrency scheduling for proof operations:
//!
//! - **Priority ordering**: high/normal/low classes, FIFO within a class
//! - **Backpressure**: at most `max_concurrent` operations in flight
//! - **Retry with backoff**: critical requests retry with exponential
//!   backoff plus jitter, re-entering at the front of the queue
//! - **Cancellation**: pending requests can be cleared before they start
//!
//! # Example
//!
//! ```ignore
//! use proofgate::queue::{operation, EnqueueOptions, Priority, RequestQueue};
//!
//! let queue = RequestQueue::with_defaults();
//! let handle = queue.enqueue(
//!     operation(|| async { generate_proof().await }),
//!     EnqueueOptions::critical(Priority::High),
//! )?;
//! let proof = handle.wait().await?;
//! ```

pub mod request;
pub mod scheduler;

#[cfg(test)]
mod proptests;

pub use request::{
    operation, CompletionHandle, EnqueueOptions, Operation, Priority, QueueStatus, QueuedRequest,
};
pub use scheduler::{
    QueueConfig, RequestQueue, DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_JITTER_MS,
};
