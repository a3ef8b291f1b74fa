//! Execution Router Module
//!
//! Decides, once per session, whether proof operations run locally,
//! remotely, or split across both:
//!
//! - **Capability detection**: can this host prove locally, with workers?
//! - **Liveness probe**: `GET <base_url>/status` with a bounded timeout
//! - **Preference ladder**: explicit caller preference, with fallback to
//!   whichever backend is usable, failing only when neither is
//!
//! # Example
//!
//! ```ignore
//! use proofgate::router::{ExecutionRouter, RouterConfig};
//!
//! let router = ExecutionRouter::from_config(&RouterConfig::default())?;
//! let context = router.initialize().await?;
//! println!("resolved mode: {}", context.mode);
//! ```

pub mod capability;
pub mod mode;
pub mod probe;
pub mod resolver;

pub use capability::{
    Capabilities, CapabilityDetector, HostCapabilityDetector, RecommendedPath,
    StaticCapabilityDetector,
};
pub use mode::{determine_mode, ExecutionMode, ExecutionPreference};
pub use probe::{HttpStatusProbe, RemoteStatus, StatusProbe, DEFAULT_PROBE_TIMEOUT_SECS};
pub use resolver::{ExecutionContext, ExecutionRouter, RouterConfig};
