//! Execution Mode Resolution
//!
//! The pure decision procedure mapping local capability, remote liveness and
//! caller preference to an execution mode. Kept free of I/O so it can be
//! tested exhaustively.

use crate::error::ProofGateError;
use crate::router::capability::RecommendedPath;
use serde::{Deserialize, Serialize};

/// Resolved execution mode for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Operations run on the local backend
    ClientSide,
    /// Operations run on the remote backend
    ServerSide,
    /// Operations are split between local workers and the remote backend
    Hybrid,
}

impl ExecutionMode {
    /// Stable string form, used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::ClientSide => "client-side",
            ExecutionMode::ServerSide => "server-side",
            ExecutionMode::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller preference for where operations should run
///
/// `Auto` is a resolution request, not a stable mode: the router resolves it
/// using the recommended-path signal from capability detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionPreference {
    /// Prefer the local backend, falling back to remote
    PreferLocal,
    /// Prefer the remote backend, falling back to local
    PreferRemote,
    /// No explicit preference
    #[default]
    Auto,
}

impl std::str::FromStr for ExecutionPreference {
    type Err = ProofGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prefer-local" | "local" => Ok(ExecutionPreference::PreferLocal),
            "prefer-remote" | "remote" => Ok(ExecutionPreference::PreferRemote),
            "auto" | "" => Ok(ExecutionPreference::Auto),
            other => Err(ProofGateError::Validation(format!(
                "unknown execution preference: {other}"
            ))),
        }
    }
}

/// Resolve the execution mode from probed state and caller preference
///
/// Deterministic and idempotent: identical inputs always produce the same
/// mode. The branches are evaluated in this exact priority order:
///
/// 1. An explicit remote preference uses the remote backend when live,
///    falls back to local when capable, and otherwise fails.
/// 2. An explicit local preference uses the local backend when capable,
///    falls back to remote when live, and otherwise fails.
/// 3. With no preference and a dead remote, local capability decides.
/// 4. With no preference and a live remote, the recommended-path signal
///    picks the mode; unrecognized or missing signals resolve to the remote
///    backend as the conservative choice.
pub fn determine_mode(
    local_capable: bool,
    remote_available: bool,
    preference: ExecutionPreference,
    recommended: Option<RecommendedPath>,
) -> Result<ExecutionMode, ProofGateError> {
    match preference {
        ExecutionPreference::PreferRemote => {
            if remote_available {
                Ok(ExecutionMode::ServerSide)
            } else if local_capable {
                Ok(ExecutionMode::ClientSide)
            } else {
                Err(ProofGateError::Compatibility(
                    "remote backend unavailable and local proving not feasible".to_string(),
                ))
            }
        }
        ExecutionPreference::PreferLocal => {
            if local_capable {
                Ok(ExecutionMode::ClientSide)
            } else if remote_available {
                Ok(ExecutionMode::ServerSide)
            } else {
                Err(ProofGateError::Compatibility(
                    "local proving not feasible and remote backend unavailable".to_string(),
                ))
            }
        }
        ExecutionPreference::Auto => {
            if !remote_available {
                if local_capable {
                    Ok(ExecutionMode::ClientSide)
                } else {
                    Err(ProofGateError::Compatibility(
                        "no usable execution backend detected".to_string(),
                    ))
                }
            } else {
                match recommended {
                    Some(RecommendedPath::Local) => Ok(ExecutionMode::ClientSide),
                    Some(RecommendedPath::Hybrid) => Ok(ExecutionMode::Hybrid),
                    Some(RecommendedPath::Remote) | None => Ok(ExecutionMode::ServerSide),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ExecutionPreference::*;

    #[test]
    fn test_prefer_remote_uses_remote_when_live() {
        let mode = determine_mode(true, true, PreferRemote, None).unwrap();
        assert_eq!(mode, ExecutionMode::ServerSide);
    }

    #[test]
    fn test_prefer_remote_falls_back_to_local() {
        let mode = determine_mode(true, false, PreferRemote, None).unwrap();
        assert_eq!(mode, ExecutionMode::ClientSide);
    }

    #[test]
    fn test_prefer_remote_fails_when_nothing_usable() {
        let err = determine_mode(false, false, PreferRemote, None).unwrap_err();
        assert!(matches!(err, ProofGateError::Compatibility(_)));
    }

    #[test]
    fn test_prefer_local_uses_local_when_capable() {
        let mode = determine_mode(true, true, PreferLocal, None).unwrap();
        assert_eq!(mode, ExecutionMode::ClientSide);
    }

    #[test]
    fn test_prefer_local_falls_back_to_remote() {
        let mode = determine_mode(false, true, PreferLocal, None).unwrap();
        assert_eq!(mode, ExecutionMode::ServerSide);
    }

    #[test]
    fn test_prefer_local_fails_when_nothing_usable() {
        let err = determine_mode(false, false, PreferLocal, None).unwrap_err();
        assert!(matches!(err, ProofGateError::Compatibility(_)));
    }

    #[test]
    fn test_auto_dead_remote_uses_local() {
        let mode = determine_mode(true, false, Auto, None).unwrap();
        assert_eq!(mode, ExecutionMode::ClientSide);
    }

    #[test]
    fn test_auto_dead_remote_fails_without_local() {
        let err = determine_mode(false, false, Auto, Some(RecommendedPath::Remote)).unwrap_err();
        assert!(matches!(err, ProofGateError::Compatibility(_)));
    }

    #[test]
    fn test_auto_follows_recommendation() {
        assert_eq!(
            determine_mode(true, true, Auto, Some(RecommendedPath::Local)).unwrap(),
            ExecutionMode::ClientSide
        );
        assert_eq!(
            determine_mode(true, true, Auto, Some(RecommendedPath::Hybrid)).unwrap(),
            ExecutionMode::Hybrid
        );
        assert_eq!(
            determine_mode(true, true, Auto, Some(RecommendedPath::Remote)).unwrap(),
            ExecutionMode::ServerSide
        );
    }

    #[test]
    fn test_auto_missing_signal_defaults_to_remote() {
        let mode = determine_mode(true, true, Auto, None).unwrap();
        assert_eq!(mode, ExecutionMode::ServerSide);
    }

    #[test]
    fn test_determinism() {
        for _ in 0..10 {
            let mode = determine_mode(true, true, Auto, Some(RecommendedPath::Hybrid)).unwrap();
            assert_eq!(mode, ExecutionMode::Hybrid);
        }
    }

    #[test]
    fn test_preference_parsing() {
        assert_eq!(
            "prefer-local".parse::<ExecutionPreference>().unwrap(),
            PreferLocal
        );
        assert_eq!(
            "prefer-remote".parse::<ExecutionPreference>().unwrap(),
            PreferRemote
        );
        assert_eq!("auto".parse::<ExecutionPreference>().unwrap(), Auto);
        assert!("sideways".parse::<ExecutionPreference>().is_err());
    }
}
