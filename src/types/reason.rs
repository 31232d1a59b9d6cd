//! Reason codes for reconciler decisions

use serde::{Deserialize, Serialize};

/// Why a tick produced the signal it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // R001: Crossings
    // =========================================================================
    /// Locked app reached the foreground, overlay shown
    R001_LOCKED_APP_FOREGROUND,
    /// Foreground left the lock set, overlay hidden
    R001_LEFT_LOCK_SET,

    // =========================================================================
    // R002: No crossing
    // =========================================================================
    /// A resume was seen but the locked/unlocked side did not change
    R002_NO_CROSSING,
    /// No resume in the window, previous hypothesis kept
    R002_HYPOTHESIS_STICKY,

    // =========================================================================
    // R003: Run flag
    // =========================================================================
    /// Monitoring paused, nothing evaluated
    R003_PAUSED,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::R001_LOCKED_APP_FOREGROUND => "R001_LOCKED_APP_FOREGROUND",
            Self::R001_LEFT_LOCK_SET => "R001_LEFT_LOCK_SET",
            Self::R002_NO_CROSSING => "R002_NO_CROSSING",
            Self::R002_HYPOTHESIS_STICKY => "R002_HYPOTHESIS_STICKY",
            Self::R003_PAUSED => "R003_PAUSED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::R001_LOCKED_APP_FOREGROUND => "Locked app in foreground",
            Self::R001_LEFT_LOCK_SET => "Foreground left the lock set",
            Self::R002_NO_CROSSING => "No lock boundary crossed",
            Self::R002_HYPOTHESIS_STICKY => "No resume seen, foreground unchanged",
            Self::R003_PAUSED => "Monitoring paused",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
