//! Usage Event Poller
//!
//! Each tick queries `[now - window_periods × period, now)`. The window is
//! deliberately longer than one period: events redelivered by overlapping
//! windows are absorbed by the reconciler, missed events are not recoverable.

use std::sync::Arc;
use std::time::Duration;
use tracing::trace;
use crate::core::source::UsageEventSource;
use crate::types::{SourceError, UsageEvent};

/// Windowed poller over a usage-event source
pub struct UsagePoller {
    source: Arc<dyn UsageEventSource>,
    period: Duration,
    window_periods: u32,
    /// End of the last successful query
    last_poll_ms: Option<i64>,
}

impl UsagePoller {
    pub fn new(source: Arc<dyn UsageEventSource>, period: Duration, window_periods: u32) -> Self {
        Self {
            source,
            period,
            window_periods: window_periods.max(1),
            last_poll_ms: None,
        }
    }

    /// Query window for a tick at `now_ms`
    pub fn window(&self, now_ms: i64) -> (i64, i64) {
        let period_ms = i64::try_from(self.period.as_millis()).unwrap_or(i64::MAX);
        let span = period_ms.saturating_mul(i64::from(self.window_periods));
        (now_ms.saturating_sub(span), now_ms)
    }

    /// Pull the events of the window ending at `now_ms`
    pub fn poll(&mut self, now_ms: i64) -> Result<Vec<UsageEvent>, SourceError> {
        let (start, end) = self.window(now_ms);
        let events = self.source.query_events(start, end)?;
        trace!(start, end, count = events.len(), "polled usage events");
        self.last_poll_ms = Some(end);
        Ok(events)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn last_poll_ms(&self) -> Option<i64> {
        self.last_poll_ms
    }
}
