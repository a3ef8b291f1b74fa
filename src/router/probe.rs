//! Remote Backend Status Probe
//!
//! Checks whether the remote proving service is alive via
//! `GET <base_url>/status`. A non-2xx response or a malformed body is
//! treated as unavailable by the router; the request always carries a
//! bounded timeout so initialization can never block indefinitely.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default probe timeout
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Status document returned by the remote proving service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteStatus {
    /// Whether the service is accepting proof work
    pub available: bool,

    /// Optional feature list advertised by the service
    #[serde(default)]
    pub features: Option<Vec<String>>,

    /// Optional service version
    #[serde(default)]
    pub version: Option<String>,
}

/// Source of remote backend liveness information
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Probe the remote backend
    ///
    /// Errors (transport failure, timeout, bad status, malformed body) are
    /// mapped to "unavailable" by the caller.
    async fn probe(&self) -> Result<RemoteStatus>;
}

/// HTTP status probe against the remote proving service
pub struct HttpStatusProbe {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpStatusProbe {
    /// Create a probe for the given base URL with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS))
    }

    /// Create a probe with an explicit request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for status probe")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    /// The URL this probe queries
    pub fn status_url(&self) -> String {
        format!("{}/status", self.base_url.trim_end_matches('/'))
    }

    /// The probe's request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl StatusProbe for HttpStatusProbe {
    async fn probe(&self) -> Result<RemoteStatus> {
        let url = self.status_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Status request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Status endpoint {} returned {}", url, status);
        }

        let body: RemoteStatus = response
            .json()
            .await
            .with_context(|| format!("Malformed status document from {}", url))?;

        tracing::debug!(
            available = body.available,
            version = body.version.as_deref().unwrap_or("unknown"),
            "remote status probed"
        );
        Ok(body)
    }
}
