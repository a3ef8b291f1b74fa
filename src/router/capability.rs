//! Local Capability Detection
//!
//! Determines whether the host can run proof generation locally and, when it
//! can, which execution path it should recommend. The detector is a trait so
//! tests can inject fixed capability sets.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Minimum hardware threads for local proving to be considered feasible
const MIN_LOCAL_THREADS: usize = 2;

/// Hardware threads above which worker-assisted proving is recommended
const WORKER_PARALLELISM_THREADS: usize = 4;

/// Execution path recommended by capability detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendedPath {
    /// Run proofs on the local backend
    Local,
    /// Run proofs on the remote backend
    Remote,
    /// Split work between local workers and the remote backend
    Hybrid,
}

/// Detected capabilities of the local environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Whether local proof execution is feasible at all
    pub local_proving: bool,

    /// Whether worker parallelism is available for proving
    pub worker_parallelism: bool,

    /// Recommended execution path, if detection produced one
    pub recommended: Option<RecommendedPath>,
}

impl Capabilities {
    /// Capabilities of a host that cannot prove locally
    pub fn none() -> Self {
        Self {
            local_proving: false,
            worker_parallelism: false,
            recommended: Some(RecommendedPath::Remote),
        }
    }
}

/// Source of local capability information
#[async_trait]
pub trait CapabilityDetector: Send + Sync {
    /// Detect the local environment's proving capabilities
    async fn detect(&self) -> Capabilities;
}

/// Default detector inspecting the host environment
///
/// Local proving is feasible when at least [`MIN_LOCAL_THREADS`] hardware
/// threads are available; worker parallelism when at least
/// [`WORKER_PARALLELISM_THREADS`]. `PROOFGATE_LOCAL_PROVING=false` forces
/// local proving off regardless of hardware.
#[derive(Debug, Clone, Default)]
pub struct HostCapabilityDetector;

impl HostCapabilityDetector {
    /// Create a host detector
    pub fn new() -> Self {
        Self
    }

    fn available_threads(&self) -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    fn local_proving_forced_off(&self) -> bool {
        std::env::var("PROOFGATE_LOCAL_PROVING")
            .map(|v| v.eq_ignore_ascii_case("false") || v == "0")
            .unwrap_or(false)
    }
}

#[async_trait]
impl CapabilityDetector for HostCapabilityDetector {
    async fn detect(&self) -> Capabilities {
        if self.local_proving_forced_off() {
            tracing::info!("local proving disabled via PROOFGATE_LOCAL_PROVING");
            return Capabilities::none();
        }

        let threads = self.available_threads();
        let local_proving = threads >= MIN_LOCAL_THREADS;
        let worker_parallelism = threads >= WORKER_PARALLELISM_THREADS;

        let recommended = if worker_parallelism {
            Some(RecommendedPath::Hybrid)
        } else if local_proving {
            Some(RecommendedPath::Local)
        } else {
            Some(RecommendedPath::Remote)
        };

        tracing::debug!(
            threads,
            local_proving,
            worker_parallelism,
            ?recommended,
            "capabilities detected"
        );

        Capabilities {
            local_proving,
            worker_parallelism,
            recommended,
        }
    }
}

/// Fixed capability set, for tests and forced configurations
#[derive(Debug, Clone, Copy)]
pub struct StaticCapabilityDetector(pub Capabilities);

#[async_trait]
impl CapabilityDetector for StaticCapabilityDetector {
    async fn detect(&self) -> Capabilities {
        self.0
    }
}
