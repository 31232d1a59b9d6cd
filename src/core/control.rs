//! Control plane: start/stop, permissions, manual overlay, boot recovery
//!
//! Owns the single running monitor. The overlay sink is handed to each monitor
//! at start and dropped with it at stop.

use std::sync::Arc;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};
use crate::config::MonitorConfig;
use crate::core::monitor::{Monitor, MonitorHandle};
use crate::core::platform::Platform;
use crate::core::sink::{BroadcastSink, SignalSink};
use crate::core::source::UsageEventSource;
use crate::core::store::{KeyValueStore, Prefs};
use crate::types::{LockSet, MonitorError, OverlayMessage};

pub const START_ACK: &str = "Service started successfully";
pub const STOP_ACK: &str = "Service stopped successfully";

/// Snapshot of the control-plane view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorStatus {
    /// A monitor task is alive
    pub monitoring: bool,
    /// Persisted run flag, inverted
    pub stopped: bool,
    pub locked_apps: Vec<String>,
}

/// Caller-facing entry point
pub struct AppLocker {
    config: MonitorConfig,
    prefs: Prefs,
    platform: Arc<dyn Platform>,
    source: Arc<dyn UsageEventSource>,
    sink: BroadcastSink,
    monitor: Mutex<Option<MonitorHandle>>,
}

impl AppLocker {
    pub fn new(
        config: MonitorConfig,
        store: Arc<dyn KeyValueStore>,
        platform: Arc<dyn Platform>,
        source: Arc<dyn UsageEventSource>,
    ) -> Self {
        Self {
            config,
            prefs: Prefs::new(store),
            platform,
            source,
            sink: BroadcastSink::new(),
            monitor: Mutex::new(None),
        }
    }

    /// Persist the lock set, mark running and (re)start the monitor.
    ///
    /// Fails with `PermissionDenied` before touching the store when the
    /// overlay cannot be drawn.
    pub async fn start_monitoring(&self, app_list: Vec<String>) -> Result<&'static str, MonitorError> {
        if !self.platform.can_draw_overlays() {
            warn!("start refused: overlay permission is not granted");
            return Err(MonitorError::PermissionDenied);
        }

        let lock_set: LockSet = app_list.into_iter().collect();
        // Run flag and task change together under the slot lock
        let mut slot = self.monitor.lock().await;
        self.prefs.save_lock_set(&lock_set)?;
        self.prefs.set_stopped(false)?;
        info!(apps = %lock_set.to_persisted(), "starting monitor");

        self.restart_monitor(&mut slot).await;
        Ok(START_ACK)
    }

    /// Mark stopped and tear the monitor down. The task is stopped even when
    /// the flag cannot be written.
    pub async fn stop_monitoring(&self) -> Result<&'static str, MonitorError> {
        let mut slot = self.monitor.lock().await;
        let persisted = self.prefs.set_stopped(true);
        if let Some(handle) = slot.take() {
            handle.stop().await;
        }
        drop(slot);
        persisted?;
        info!("monitor stopped by caller");
        Ok(STOP_ACK)
    }

    /// Boot-time trigger: restart with the persisted lock set iff the last
    /// persisted run flag was "running". Returns whether a monitor was started.
    pub async fn boot_recover(&self) -> Result<bool, MonitorError> {
        let mut slot = self.monitor.lock().await;
        if self.prefs.is_stopped() {
            info!("boot: monitoring was stopped, not restarting");
            return Ok(false);
        }
        if !self.platform.can_draw_overlays() {
            warn!("boot: overlay permission is not granted, not restarting");
            return Err(MonitorError::PermissionDenied);
        }
        self.restart_monitor(&mut slot).await;
        info!("boot: monitoring restarted");
        Ok(true)
    }

    async fn restart_monitor(&self, slot: &mut Option<MonitorHandle>) {
        if let Some(previous) = slot.take() {
            previous.stop().await;
        }
        let sink: Arc<dyn SignalSink> = Arc::new(self.sink.clone());
        let monitor = Monitor::new(
            self.config.clone(),
            Arc::clone(&self.source),
            self.prefs.clone(),
            sink,
            Arc::clone(&self.platform),
        );
        *slot = Some(monitor.spawn());
    }

    pub fn check_overlay_permission(&self) -> bool {
        self.platform.can_draw_overlays()
    }

    pub fn ask_overlay_permission(&self) -> bool {
        self.platform.request_overlay_permission()
    }

    pub fn check_usage_stats_permission(&self) -> bool {
        self.platform.has_usage_access()
    }

    pub fn ask_usage_stats_permission(&self) -> bool {
        self.platform.request_usage_access()
    }

    /// Push a SHOW to the UI layer without touching the reconciler
    pub fn show_overlay(&self) -> bool {
        self.sink.deliver(OverlayMessage::ShowOverlay(None));
        true
    }

    /// Push a HIDE to the UI layer without touching the reconciler
    pub fn hide_overlay(&self) -> bool {
        self.sink.deliver(OverlayMessage::HideOverlay);
        true
    }

    /// UI-side receiver for overlay messages
    pub fn subscribe(&self) -> broadcast::Receiver<OverlayMessage> {
        self.sink.subscribe()
    }

    pub async fn is_monitoring(&self) -> bool {
        self.monitor
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub async fn status(&self) -> MonitorStatus {
        MonitorStatus {
            monitoring: self.is_monitoring().await,
            stopped: self.prefs.is_stopped(),
            locked_apps: self.prefs.lock_set().to_vec(),
        }
    }
}
