//! Core modules for applock

pub mod api;
pub mod control;
pub mod monitor;
pub mod platform;
pub mod poller;
pub mod reconciler;
pub mod sink;
pub mod source;
pub mod store;

pub use api::{create_router, run_server};
pub use control::{AppLocker, MonitorStatus, START_ACK, STOP_ACK};
pub use monitor::{Monitor, MonitorHandle};
pub use platform::{Platform, SimulatedPlatform};
pub use poller::UsagePoller;
pub use reconciler::ForegroundReconciler;
pub use sink::{BroadcastSink, SignalSink};
pub use source::{JsonlUsageLog, MemoryUsageLog, UsageEventSource};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, Prefs};
