//! applock: foreground-app lock monitor
//!
//! Poll the usage-event log → ForegroundReconciler → overlay signal

pub mod config;
pub mod core;
pub mod types;

// =============================================================================
// POLLING [C]
// =============================================================================

/// Default tick period (milliseconds)
pub const DEFAULT_POLL_PERIOD_MS: u64 = 500;

/// Query window length, in tick periods.
/// Two periods so events landing in timer jitter are still seen.
pub const DEFAULT_WINDOW_PERIODS: u32 = 2;

// =============================================================================
// PERSISTED KEYS [C] - shared with the UI layer
// =============================================================================

/// Comma-joined locked process identifiers
pub const KEY_APP_DATA: &str = "app_data";

/// "0" = running, "1" = stopped
pub const KEY_IS_STOPPED: &str = "is_stopped";

pub const STOPPED_VALUE: &str = "1";
pub const RUNNING_VALUE: &str = "0";

// =============================================================================
// EVENT PLANE [C]
// =============================================================================

/// Capacity of the overlay broadcast channel
pub const SIGNAL_CHANNEL_CAPACITY: usize = 100;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "0.1.0";
