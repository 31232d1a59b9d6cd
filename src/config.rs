//! Monitor configuration

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::{DEFAULT_POLL_PERIOD_MS, DEFAULT_WINDOW_PERIODS};

/// When the lock set is read from the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockSetRefresh {
    /// Once, when the monitor starts
    #[default]
    OnStart,
    /// At the start of every tick
    EveryTick,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("config format: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunables for the poll-and-reconcile loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Tick period (milliseconds)
    pub poll_period_ms: u64,
    /// Query window length in periods
    pub window_periods: u32,
    pub lock_set_refresh: LockSetRefresh,
    /// Send the user home when a locked app is detected
    pub force_home: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_period_ms: DEFAULT_POLL_PERIOD_MS,
            window_periods: DEFAULT_WINDOW_PERIODS,
            lock_set_refresh: LockSetRefresh::OnStart,
            force_home: true,
        }
    }
}

impl MonitorConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Tick period, never zero
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms.max(1))
    }
}
