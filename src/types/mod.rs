//! Core types for applock

mod error;
mod event;
mod lock_set;
mod output;
mod reason;
mod signals;
mod state;

pub use error::{MonitorError, PlatformError, SourceError, StoreError};
pub use event::{EventKind, UsageEvent, CODE_ACTIVITY_RESUMED, CODE_ACTIVITY_STOPPED};
pub use lock_set::LockSet;
pub use output::TickOutput;
pub use reason::ReasonCode;
pub use signals::{OverlayMessage, ShowArguments, Signal};
pub use state::{ForegroundState, OverlayState};
