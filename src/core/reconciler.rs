//! Foreground Reconciler: single-hypothesis overlay state machine
//!
//! Per tick:
//! - paused → NONE, state untouched
//! - latest RESUMED in the window becomes the foreground hypothesis
//! - no RESUMED → hypothesis kept from the previous tick
//! - HIDDEN → SHOWN when the hypothesis enters the lock set (emit SHOW)
//! - SHOWN → HIDDEN when the hypothesis leaves the lock set (emit HIDE)
//! - anything else → NONE

use tracing::{debug, info};
use crate::types::{
    ForegroundState, LockSet, OverlayState, ReasonCode, Signal, TickOutput, UsageEvent,
};

/// Overlay state machine
#[derive(Debug, Default)]
pub struct ForegroundReconciler {
    state: ForegroundState,
    /// Ticks evaluated while running
    tick_count: u64,
}

impl ForegroundReconciler {
    /// Create new reconciler: nothing locked is in the foreground
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile one polled window against the lock set
    pub fn process(
        &mut self,
        events: &[UsageEvent],
        lock_set: &LockSet,
        running: bool,
    ) -> TickOutput {
        if !running {
            return self.output(Signal::None, ReasonCode::R003_PAUSED, events.len());
        }
        self.tick_count += 1;

        let resumed = latest_resumed(events);
        if let Some(event) = resumed {
            if self.state.current_foreground_app.as_deref() != Some(event.package.as_str()) {
                debug!(package = %event.package, ts = event.timestamp_ms, "foreground changed");
            }
            self.state.current_foreground_app = Some(event.package.clone());
        }

        let (signal, reason) = self.compute_transition(lock_set, resumed.is_some());

        match &signal {
            Signal::Show(package) => {
                self.state.overlay = OverlayState::Shown;
                info!(package = %package, "locked app in foreground, showing overlay");
            }
            Signal::Hide => {
                self.state.overlay = OverlayState::Hidden;
                info!(
                    foreground = self.state.current_foreground_app.as_deref().unwrap_or("-"),
                    "foreground left lock set, hiding overlay"
                );
            }
            Signal::None => {}
        }

        self.output(signal, reason, events.len())
    }

    /// Decide the signal from the current hypothesis
    fn compute_transition(&self, lock_set: &LockSet, saw_resume: bool) -> (Signal, ReasonCode) {
        let locked = self
            .state
            .current_foreground_app
            .as_deref()
            .filter(|package| lock_set.contains(package));

        match (locked, self.state.overlay) {
            (Some(package), OverlayState::Hidden) => (
                Signal::Show(package.to_string()),
                ReasonCode::R001_LOCKED_APP_FOREGROUND,
            ),
            (None, OverlayState::Shown) => (Signal::Hide, ReasonCode::R001_LEFT_LOCK_SET),
            _ if saw_resume => (Signal::None, ReasonCode::R002_NO_CROSSING),
            _ => (Signal::None, ReasonCode::R002_HYPOTHESIS_STICKY),
        }
    }

    fn output(&self, signal: Signal, reason: ReasonCode, events_seen: usize) -> TickOutput {
        TickOutput::new(
            signal,
            self.state.current_foreground_app.clone(),
            self.state.overlay,
            reason,
            events_seen,
        )
    }

    /// Get current state
    pub fn state(&self) -> &ForegroundState {
        &self.state
    }

    /// Current foreground hypothesis
    pub fn foreground(&self) -> Option<&str> {
        self.state.current_foreground_app.as_deref()
    }

    pub fn overlay_visible(&self) -> bool {
        self.state.overlay_visible()
    }

    /// Get tick count
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Reset to initial state
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Latest RESUMED event of the window.
///
/// Greatest timestamp wins; equal timestamps go to the later position.
fn latest_resumed(events: &[UsageEvent]) -> Option<&UsageEvent> {
    events
        .iter()
        .filter(|e| e.is_resumed())
        .fold(None, |best: Option<&UsageEvent>, e| match best {
            Some(b) if b.timestamp_ms > e.timestamp_ms => Some(b),
            _ => Some(e),
        })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventKind;

    fn locked(packages: &[&str]) -> LockSet {
        packages.iter().copied().collect()
    }

    #[test]
    fn test_initial_state_is_hidden() {
        let reconciler = ForegroundReconciler::new();
        assert_eq!(reconciler.foreground(), None);
        assert!(!reconciler.overlay_visible());
    }

    #[test]
    fn test_resume_of_locked_app_shows() {
        let mut r = ForegroundReconciler::new();
        let out = r.process(&[UsageEvent::resumed(1, "com.game")], &locked(&["com.game"]), true);
        assert_eq!(out.signal, Signal::Show("com.game".into()));
        assert_eq!(out.reason, ReasonCode::R001_LOCKED_APP_FOREGROUND);
        assert!(r.overlay_visible());
    }

    #[test]
    fn test_resume_of_unlocked_app_hides() {
        let mut r = ForegroundReconciler::new();
        let set = locked(&["com.game"]);
        r.process(&[UsageEvent::resumed(1, "com.game")], &set, true);

        let out = r.process(&[UsageEvent::resumed(2, "com.mail")], &set, true);
        assert_eq!(out.signal, Signal::Hide);
        assert_eq!(out.foreground.as_deref(), Some("com.mail"));
        assert!(!r.overlay_visible());
    }

    #[test]
    fn test_repeated_resume_is_idempotent() {
        let mut r = ForegroundReconciler::new();
        let set = locked(&["com.game"]);
        let window = [UsageEvent::resumed(1, "com.game")];
        r.process(&window, &set, true);

        let out = r.process(&window, &set, true);
        assert_eq!(out.signal, Signal::None);
        assert_eq!(out.reason, ReasonCode::R002_NO_CROSSING);
    }

    #[test]
    fn test_empty_window_is_sticky() {
        let mut r = ForegroundReconciler::new();
        let set = locked(&["com.game"]);
        r.process(&[UsageEvent::resumed(1, "com.game")], &set, true);

        let out = r.process(&[], &set, true);
        assert_eq!(out.signal, Signal::None);
        assert_eq!(out.reason, ReasonCode::R002_HYPOTHESIS_STICKY);
        assert_eq!(r.foreground(), Some("com.game"));
    }

    #[test]
    fn test_non_resume_events_do_not_move_hypothesis() {
        let mut r = ForegroundReconciler::new();
        let set = locked(&["com.game"]);
        r.process(&[UsageEvent::resumed(1, "com.game")], &set, true);

        let window = [
            UsageEvent::stopped(2, "com.game"),
            UsageEvent::new(3, "com.mail", EventKind::Other),
        ];
        let out = r.process(&window, &set, true);
        assert_eq!(out.signal, Signal::None);
        assert_eq!(r.foreground(), Some("com.game"));
    }

    #[test]
    fn test_latest_timestamp_wins_out_of_order() {
        let window = [
            UsageEvent::resumed(30, "com.late"),
            UsageEvent::resumed(10, "com.early"),
        ];
        assert_eq!(latest_resumed(&window).unwrap().package, "com.late");
    }

    #[test]
    fn test_equal_timestamps_go_to_later_position() {
        let window = [
            UsageEvent::resumed(10, "com.first"),
            UsageEvent::resumed(10, "com.second"),
        ];
        assert_eq!(latest_resumed(&window).unwrap().package, "com.second");
    }

    #[test]
    fn test_paused_leaves_state_untouched() {
        let mut r = ForegroundReconciler::new();
        let set = locked(&["com.game"]);
        let before = r.state().clone();

        let out = r.process(&[UsageEvent::resumed(1, "com.game")], &set, false);
        assert_eq!(out.signal, Signal::None);
        assert_eq!(out.reason, ReasonCode::R003_PAUSED);
        assert_eq!(r.state(), &before);
        assert_eq!(r.tick_count(), 0);
    }

    #[test]
    fn test_lock_set_shrink_hides_on_next_tick() {
        let mut r = ForegroundReconciler::new();
        r.process(&[UsageEvent::resumed(1, "com.game")], &locked(&["com.game"]), true);

        let out = r.process(&[], &LockSet::new(), true);
        assert_eq!(out.signal, Signal::Hide);
        assert_eq!(out.reason, ReasonCode::R001_LEFT_LOCK_SET);
    }

    #[test]
    fn test_reset_clears_hypothesis() {
        let mut r = ForegroundReconciler::new();
        r.process(&[UsageEvent::resumed(1, "com.game")], &locked(&["com.game"]), true);
        r.reset();
        assert_eq!(r.foreground(), None);
        assert!(!r.overlay_visible());
    }
}
