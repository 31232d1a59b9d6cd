//! Poll-and-reconcile loop
//!
//! One tokio task per running monitor. `tick` takes `&mut self` and the task
//! awaits nothing inside a tick, so ticks never overlap; late ticks are
//! delayed, not bunched.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use crate::config::{LockSetRefresh, MonitorConfig};
use crate::core::platform::Platform;
use crate::core::poller::UsagePoller;
use crate::core::reconciler::ForegroundReconciler;
use crate::core::sink::SignalSink;
use crate::core::source::UsageEventSource;
use crate::core::store::Prefs;
use crate::types::{LockSet, Signal, TickOutput};

/// Poller + reconciler + outbound signal plumbing
pub struct Monitor {
    config: MonitorConfig,
    poller: UsagePoller,
    reconciler: ForegroundReconciler,
    prefs: Prefs,
    lock_set: LockSet,
    sink: Arc<dyn SignalSink>,
    platform: Arc<dyn Platform>,
}

impl Monitor {
    /// Create a monitor; the lock set is loaded from the store here
    pub fn new(
        config: MonitorConfig,
        source: Arc<dyn UsageEventSource>,
        prefs: Prefs,
        sink: Arc<dyn SignalSink>,
        platform: Arc<dyn Platform>,
    ) -> Self {
        let lock_set = prefs.lock_set();
        info!(locked = lock_set.len(), apps = %lock_set.to_persisted(), "loaded locked apps");
        Self {
            poller: UsagePoller::new(source, config.period(), config.window_periods),
            config,
            reconciler: ForegroundReconciler::new(),
            prefs,
            lock_set,
            sink,
            platform,
        }
    }

    /// One tick at wall-clock `now_ms`.
    ///
    /// Returns `None` when the event source was unavailable and the tick was
    /// skipped.
    pub fn tick(&mut self, now_ms: i64) -> Option<TickOutput> {
        if self.config.lock_set_refresh == LockSetRefresh::EveryTick {
            self.lock_set = self.prefs.lock_set();
        }

        if self.prefs.is_stopped() {
            debug!("monitoring paused, skipping check");
            return Some(self.reconciler.process(&[], &self.lock_set, false));
        }

        let events = match self.poller.poll(now_ms) {
            Ok(events) => events,
            Err(e) => {
                debug!(error = %e, "usage events unavailable, tick skipped");
                return None;
            }
        };

        let output = self.reconciler.process(&events, &self.lock_set, true);
        self.dispatch(&output.signal);
        Some(output)
    }

    /// Push the signal to the UI layer and run the force-home policy
    fn dispatch(&self, signal: &Signal) {
        if let Some(message) = signal.to_message() {
            self.sink.deliver(message);
        }
        if matches!(signal, Signal::Show(_)) && self.config.force_home {
            match self.platform.go_home() {
                Ok(()) => debug!("forced back to home screen"),
                Err(e) => warn!(error = %e, "force home failed"),
            }
        }
    }

    pub fn lock_set(&self) -> &LockSet {
        &self.lock_set
    }

    pub fn tick_count(&self) -> u64 {
        self.reconciler.tick_count()
    }

    /// Run on the current tokio runtime until the handle is stopped
    pub fn spawn(self) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        MonitorHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.period();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_ms = period.as_millis() as u64, "monitor started");

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    let started = Instant::now();
                    self.tick(chrono::Utc::now().timestamp_millis());
                    let elapsed = started.elapsed();
                    if elapsed > period {
                        warn!(elapsed_ms = elapsed.as_millis() as u64, "tick overran its period");
                    }
                }
            }
        }

        info!(ticks = self.tick_count(), "monitor stopped");
    }
}

/// Running monitor task
#[derive(Debug)]
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop the task and wait for it. No tick runs after this returns.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "monitor task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::SimulatedPlatform;
    use crate::core::sink::BroadcastSink;
    use crate::core::source::MemoryUsageLog;
    use crate::core::store::MemoryStore;
    use crate::types::{OverlayMessage, UsageEvent};

    struct Fixture {
        log: Arc<MemoryUsageLog>,
        prefs: Prefs,
        sink: BroadcastSink,
        platform: Arc<SimulatedPlatform>,
    }

    fn fixture(locked: &str) -> Fixture {
        let prefs = Prefs::new(Arc::new(MemoryStore::new()));
        prefs.save_lock_set(&LockSet::from_persisted(locked)).unwrap();
        prefs.set_stopped(false).unwrap();
        Fixture {
            log: Arc::new(MemoryUsageLog::new()),
            prefs,
            sink: BroadcastSink::new(),
            platform: Arc::new(SimulatedPlatform::granted()),
        }
    }

    fn monitor(f: &Fixture, config: MonitorConfig) -> Monitor {
        Monitor::new(
            config,
            f.log.clone(),
            f.prefs.clone(),
            Arc::new(f.sink.clone()),
            f.platform.clone(),
        )
    }

    #[test]
    fn test_show_delivers_and_goes_home() {
        let f = fixture("com.game");
        let mut rx = f.sink.subscribe();
        let mut m = monitor(&f, MonitorConfig::default());

        f.log.push(UsageEvent::resumed(9_800, "com.game"));
        let out = m.tick(10_000).unwrap();

        assert_eq!(out.signal, Signal::Show("com.game".into()));
        assert_eq!(
            rx.try_recv().unwrap(),
            OverlayMessage::show("com.game")
        );
        assert_eq!(f.platform.home_presses(), 1);
    }

    #[test]
    fn test_force_home_can_be_disabled() {
        let f = fixture("com.game");
        let config = MonitorConfig {
            force_home: false,
            ..MonitorConfig::default()
        };
        let mut m = monitor(&f, config);

        f.log.push(UsageEvent::resumed(9_800, "com.game"));
        m.tick(10_000);
        assert_eq!(f.platform.home_presses(), 0);
    }

    #[test]
    fn test_unavailable_source_skips_tick() {
        let f = fixture("com.game");
        let mut m = monitor(&f, MonitorConfig::default());
        f.log.set_available(false);

        assert!(m.tick(10_000).is_none());
        assert_eq!(m.tick_count(), 0);
    }

    #[test]
    fn test_stopped_flag_pauses() {
        let f = fixture("com.game");
        let mut rx = f.sink.subscribe();
        let mut m = monitor(&f, MonitorConfig::default());
        f.prefs.set_stopped(true).unwrap();

        f.log.push(UsageEvent::resumed(9_800, "com.game"));
        let out = m.tick(10_000).unwrap();
        assert_eq!(out.signal, Signal::None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_lock_set_loaded_once_by_default() {
        let f = fixture("com.game");
        let mut m = monitor(&f, MonitorConfig::default());
        f.prefs.save_lock_set(&LockSet::from_persisted("com.mail")).unwrap();

        f.log.push(UsageEvent::resumed(9_800, "com.mail"));
        assert_eq!(m.tick(10_000).unwrap().signal, Signal::None);
        assert!(m.lock_set().contains("com.game"));
    }

    #[test]
    fn test_lock_set_reloaded_every_tick_when_configured() {
        let f = fixture("com.game");
        let config = MonitorConfig {
            lock_set_refresh: LockSetRefresh::EveryTick,
            ..MonitorConfig::default()
        };
        let mut m = monitor(&f, config);
        f.prefs.save_lock_set(&LockSet::from_persisted("com.mail")).unwrap();

        f.log.push(UsageEvent::resumed(9_800, "com.mail"));
        assert_eq!(m.tick(10_000).unwrap().signal, Signal::Show("com.mail".into()));
    }

    #[tokio::test]
    async fn test_spawned_monitor_stops() {
        let f = fixture("com.game");
        let config = MonitorConfig {
            poll_period_ms: 10,
            ..MonitorConfig::default()
        };
        let handle = monitor(&f, config).spawn();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert!(!handle.is_finished());
        handle.stop().await;
    }
}
