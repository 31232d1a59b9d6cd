//! Per-tick output structures for terminal display and logs

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use crate::types::{OverlayState, ReasonCode, Signal};

/// Result of one reconciler tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutput {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Signal to deliver, `Signal::None` when nothing crossed
    pub signal: Signal,
    /// Foreground hypothesis after the tick
    pub foreground: Option<String>,
    /// Overlay state after the tick
    pub overlay: OverlayState,
    /// Why this signal
    pub reason: ReasonCode,
    /// Events in the polled window
    pub events_seen: usize,
}

impl TickOutput {
    /// Create new output
    pub fn new(
        signal: Signal,
        foreground: Option<String>,
        overlay: OverlayState,
        reason: ReasonCode,
        events_seen: usize,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            signal,
            foreground,
            overlay,
            reason,
            events_seen,
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let signal = match &self.signal {
            Signal::None => self.signal.to_string().dimmed(),
            Signal::Show(_) | Signal::Hide => self.signal.to_string().bold(),
        };
        format!(
            "{} {} | fg={} | overlay={} | events={} | {}",
            self.overlay.emoji(),
            signal,
            self.foreground.as_deref().unwrap_or("-"),
            self.overlay.paint(&self.overlay.to_string()),
            self.events_seen,
            self.reason.code().dimmed(),
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "signal={} | fg={} | overlay={} | events={} | reason={}",
            self.signal,
            self.foreground.as_deref().unwrap_or("-"),
            self.overlay,
            self.events_seen,
            self.reason.code()
        )
    }
}
