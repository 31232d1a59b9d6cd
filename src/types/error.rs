//! Error types for the monitor and its collaborators

use thiserror::Error;

/// Failures surfaced to control-plane callers
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Overlay-display permission absent. Caller must request it and start again.
    #[error("Overlay permission is not granted")]
    PermissionDenied,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl MonitorError {
    /// Stable code for the control-plane wire format
    pub fn code(&self) -> &'static str {
        match self {
            MonitorError::PermissionDenied => "PERMISSION_DENIED",
            MonitorError::Store(_) => "STORE_ERROR",
        }
    }
}

/// Usage-event source could not be queried. Transient: the tick is skipped.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("usage event source unavailable: {0}")]
    Unavailable(String),

    #[error("usage event source I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding: {0}")]
    Json(#[from] serde_json::Error),
}

/// Home-screen action failed (best effort, logged only)
#[derive(Debug, Error)]
#[error("platform action failed: {0}")]
pub struct PlatformError(pub String);
