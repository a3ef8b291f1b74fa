//! ProofGate Scheduler Library
//!
//! Admission control and scheduling for zero-knowledge proof workloads:
//! a priority request queue with bounded concurrency and retry, a
//! per-principal multi-window rate limiter, and a capability-based
//! execution-mode router, composed by [`coordinator::ProofScheduler`].

pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod rate_limit;
pub mod router;

pub use config::Config;
pub use coordinator::{ProofScheduler, SchedulerStatus};
pub use error::ProofGateError;
pub use queue::{operation, CompletionHandle, EnqueueOptions, Priority};
pub use rate_limit::{LimitType, RateLimitDecision};
pub use router::{ExecutionMode, ExecutionPreference};
