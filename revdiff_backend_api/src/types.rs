use serde::{Deserialize, Serialize};

/// Summary information about a registered backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSummary {
    /// Stable identifier for the backend.
    pub id: String,
    /// Human-friendly label for display.
    pub label: String,
    /// Whether the backend would run right now.
    pub available: bool,
}

/// Errors surfaced by diff backends.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Backend is not present in this environment.
    #[error("diff backend '{backend}' is not available")]
    Unavailable {
        /// Identifier of the backend.
        backend: &'static str,
    },
    /// External tool exceeded its time budget and was killed.
    #[error("diff backend '{backend}' timed out after {seconds}s")]
    TimedOut {
        /// Identifier of the backend.
        backend: &'static str,
        /// Configured timeout.
        seconds: u64,
    },
    /// Generic failure surfaced by the backend.
    #[error("{message}")]
    Failure {
        /// Human-readable error message.
        message: String,
    },
}

impl BackendError {
    /// Helper to construct a failure from any displayable message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}

/// Convenience result alias for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;
