//! Execution Router
//!
//! Resolves, once per session, which backend subsequent operations should
//! target. Capability detection and the remote status probe run behind
//! injectable traits; the resolution itself is the pure decision procedure
//! in [`crate::router::mode`].

use crate::error::ProofGateError;
use crate::metrics;
use crate::router::capability::{Capabilities, CapabilityDetector, HostCapabilityDetector};
use crate::router::mode::{determine_mode, ExecutionMode, ExecutionPreference};
use crate::router::probe::{HttpStatusProbe, StatusProbe, DEFAULT_PROBE_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Router configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Base URL of the remote proving service
    pub remote_base_url: String,

    /// Timeout for the remote status probe, in seconds
    pub probe_timeout_secs: u64,

    /// Caller preference for where operations should run
    pub preference: ExecutionPreference,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            remote_base_url: "http://127.0.0.1:8080".to_string(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            preference: ExecutionPreference::Auto,
        }
    }
}

/// Resolved execution context for a session
///
/// Created once during initialization; immutable until an explicit forced
/// re-initialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionContext {
    /// Detected local capabilities
    pub capabilities: Capabilities,

    /// Preference the resolution was made under
    pub preference: ExecutionPreference,

    /// Whether the remote backend answered the status probe as available
    pub remote_available: bool,

    /// The resolved execution mode
    pub mode: ExecutionMode,
}

/// Capability-based execution-mode router
///
/// Cloning shares the resolved context.
#[derive(Clone)]
pub struct ExecutionRouter {
    preference: ExecutionPreference,
    probe_timeout: Duration,
    detector: Arc<dyn CapabilityDetector>,
    probe: Arc<dyn StatusProbe>,
    context: Arc<RwLock<Option<ExecutionContext>>>,
}

impl ExecutionRouter {
    /// Create a router with injected detector and probe
    pub fn new(
        preference: ExecutionPreference,
        probe_timeout: Duration,
        detector: Arc<dyn CapabilityDetector>,
        probe: Arc<dyn StatusProbe>,
    ) -> Self {
        Self {
            preference,
            probe_timeout,
            detector,
            probe,
            context: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a router from configuration, using the host detector and the
    /// HTTP status probe
    pub fn from_config(config: &RouterConfig) -> Result<Self, ProofGateError> {
        let timeout = Duration::from_secs(config.probe_timeout_secs);
        let probe = HttpStatusProbe::with_timeout(&config.remote_base_url, timeout)
            .map_err(|e| ProofGateError::Validation(e.to_string()))?;
        Ok(Self::new(
            config.preference,
            timeout,
            Arc::new(HostCapabilityDetector::new()),
            Arc::new(probe),
        ))
    }

    /// Resolve the execution mode, reusing a previous resolution if present
    pub async fn initialize(&self) -> Result<ExecutionContext, ProofGateError> {
        self.initialize_with(false).await
    }

    /// Resolve the execution mode
    ///
    /// With `force_reinit` the capabilities are re-detected and the remote
    /// backend re-probed even if a resolution already exists.
    pub async fn initialize_with(
        &self,
        force_reinit: bool,
    ) -> Result<ExecutionContext, ProofGateError> {
        if !force_reinit {
            if let Some(context) = self.context.read().await.clone() {
                return Ok(context);
            }
        }

        let capabilities = self.detector.detect().await;
        let remote_available = self.probe_remote().await;

        let mode = determine_mode(
            capabilities.local_proving,
            remote_available,
            self.preference,
            capabilities.recommended,
        )?;

        metrics::MODE_RESOLUTIONS_TOTAL
            .with_label_values(&[mode.as_str()])
            .inc();
        tracing::info!(
            mode = %mode,
            remote_available,
            local_proving = capabilities.local_proving,
            preference = ?self.preference,
            "execution mode resolved"
        );

        let context = ExecutionContext {
            capabilities,
            preference: self.preference,
            remote_available,
            mode,
        };
        *self.context.write().await = Some(context.clone());
        Ok(context)
    }

    /// Probe remote liveness, mapping every failure to "unavailable"
    async fn probe_remote(&self) -> bool {
        match tokio::time::timeout(self.probe_timeout, self.probe.probe()).await {
            Ok(Ok(status)) => status.available,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "remote status probe failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "remote status probe timed out"
                );
                false
            }
        }
    }

    /// The resolved mode, if initialization has happened
    pub async fn mode(&self) -> Option<ExecutionMode> {
        self.context.read().await.as_ref().map(|c| c.mode)
    }

    /// The resolved context, if initialization has happened
    pub async fn context(&self) -> Option<ExecutionContext> {
        self.context.read().await.clone()
    }

    /// Whether a resolution exists
    pub async fn is_initialized(&self) -> bool {
        self.context.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::capability::{RecommendedPath, StaticCapabilityDetector};
    use crate::router::probe::RemoteStatus;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProbe {
        available: bool,
        calls: AtomicUsize,
    }

    impl FixedProbe {
        fn new(available: bool) -> Self {
            Self {
                available,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StatusProbe for FixedProbe {
        async fn probe(&self) -> Result<RemoteStatus> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RemoteStatus {
                available: self.available,
                features: None,
                version: None,
            })
        }
    }

    struct FailingProbe;

    #[async_trait]
    impl StatusProbe for FailingProbe {
        async fn probe(&self) -> Result<RemoteStatus> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    struct HangingProbe;

    #[async_trait]
    impl StatusProbe for HangingProbe {
        async fn probe(&self) -> Result<RemoteStatus> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            unreachable!("probe should have timed out")
        }
    }

    fn capable() -> Arc<StaticCapabilityDetector> {
        Arc::new(StaticCapabilityDetector(Capabilities {
            local_proving: true,
            worker_parallelism: true,
            recommended: Some(RecommendedPath::Hybrid),
        }))
    }

    fn incapable() -> Arc<StaticCapabilityDetector> {
        Arc::new(StaticCapabilityDetector(Capabilities::none()))
    }

    #[tokio::test]
    async fn test_resolution_happens_once() {
        let probe = Arc::new(FixedProbe::new(true));
        let router = ExecutionRouter::new(
            ExecutionPreference::PreferRemote,
            Duration::from_secs(1),
            capable(),
            Arc::clone(&probe) as Arc<dyn StatusProbe>,
        );

        let first = router.initialize().await.unwrap();
        let second = router.initialize().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_reinit_probes_again() {
        let probe = Arc::new(FixedProbe::new(true));
        let router = ExecutionRouter::new(
            ExecutionPreference::PreferRemote,
            Duration::from_secs(1),
            capable(),
            Arc::clone(&probe) as Arc<dyn StatusProbe>,
        );

        router.initialize().await.unwrap();
        router.initialize_with(true).await.unwrap();
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_probe_timeout_falls_back_to_local() {
        // Scenario: prefer-remote, probe hangs past the timeout, host is
        // locally capable: resolves to the local backend.
        let router = ExecutionRouter::new(
            ExecutionPreference::PreferRemote,
            Duration::from_millis(20),
            capable(),
            Arc::new(HangingProbe),
        );

        let context = router.initialize().await.unwrap();
        assert!(!context.remote_available);
        assert_eq!(context.mode, ExecutionMode::ClientSide);
    }

    #[tokio::test]
    async fn test_probe_timeout_without_local_is_fatal() {
        let router = ExecutionRouter::new(
            ExecutionPreference::PreferRemote,
            Duration::from_millis(20),
            incapable(),
            Arc::new(HangingProbe),
        );

        let err = router.initialize().await.unwrap_err();
        assert!(matches!(err, ProofGateError::Compatibility(_)));
        assert!(!router.is_initialized().await);
    }

    #[tokio::test]
    async fn test_probe_error_treated_as_unavailable() {
        let router = ExecutionRouter::new(
            ExecutionPreference::Auto,
            Duration::from_secs(1),
            capable(),
            Arc::new(FailingProbe),
        );

        let context = router.initialize().await.unwrap();
        assert!(!context.remote_available);
        assert_eq!(context.mode, ExecutionMode::ClientSide);
    }

    #[tokio::test]
    async fn test_auto_with_live_remote_follows_recommendation() {
        let router = ExecutionRouter::new(
            ExecutionPreference::Auto,
            Duration::from_secs(1),
            capable(),
            Arc::new(FixedProbe::new(true)),
        );

        let context = router.initialize().await.unwrap();
        assert_eq!(context.mode, ExecutionMode::Hybrid);
        assert_eq!(router.mode().await, Some(ExecutionMode::Hybrid));
    }

    #[tokio::test]
    async fn test_remote_reports_unavailable() {
        // A 200 response whose body says unavailable counts as not live.
        let router = ExecutionRouter::new(
            ExecutionPreference::PreferRemote,
            Duration::from_secs(1),
            capable(),
            Arc::new(FixedProbe::new(false)),
        );

        let context = router.initialize().await.unwrap();
        assert_eq!(context.mode, ExecutionMode::ClientSide);
    }
}
