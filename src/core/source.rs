//! Usage-event sources
//!
//! A source answers "which usage events landed in `[start, end)`". It does no
//! filtering beyond the window and no deduplication.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};
use crate::types::{SourceError, UsageEvent};

/// Platform usage log
pub trait UsageEventSource: Send + Sync {
    /// Events with `start_ms <= timestamp_ms < end_ms`, ordered by timestamp
    fn query_events(&self, start_ms: i64, end_ms: i64) -> Result<Vec<UsageEvent>, SourceError>;
}

/// In-memory usage log. Producers push, the poller queries.
#[derive(Debug)]
pub struct MemoryUsageLog {
    events: Mutex<Vec<UsageEvent>>,
    available: Mutex<bool>,
}

impl MemoryUsageLog {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            available: Mutex::new(true),
        }
    }

    /// Build a log pre-filled with events
    pub fn with_events(events: impl IntoIterator<Item = UsageEvent>) -> Self {
        let log = Self::new();
        for event in events {
            log.push(event);
        }
        log
    }

    pub fn push(&self, event: UsageEvent) {
        lock(&self.events).push(event);
    }

    /// Toggle availability. An unavailable log fails every query.
    pub fn set_available(&self, available: bool) {
        *lock(&self.available) = available;
    }

    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamp span of the log, if non-empty
    pub fn span(&self) -> Option<(i64, i64)> {
        let events = lock(&self.events);
        let first = events.iter().map(|e| e.timestamp_ms).min()?;
        let last = events.iter().map(|e| e.timestamp_ms).max()?;
        Some((first, last))
    }
}

impl Default for MemoryUsageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageEventSource for MemoryUsageLog {
    fn query_events(&self, start_ms: i64, end_ms: i64) -> Result<Vec<UsageEvent>, SourceError> {
        if !*lock(&self.available) {
            return Err(SourceError::Unavailable("memory log disabled".to_string()));
        }
        Ok(in_window(lock(&self.events).iter().cloned(), start_ms, end_ms))
    }
}

/// JSON-lines usage log on disk, one `UsageEvent` per line.
///
/// An external producer appends to the file. Each query reads only the
/// complete lines written since the previous one; a trailing line without its
/// newline waits for the next query. A file that shrank is read again from
/// the start. Events older than the latest query start are dropped from the
/// cache, so queries are expected to move forward in time the way the poller
/// issues them. A missing file means the source is unavailable.
#[derive(Debug)]
pub struct JsonlUsageLog {
    path: PathBuf,
    tail: Mutex<Tail>,
}

/// Read position and the decoded events still inside the query horizon
#[derive(Debug, Default)]
struct Tail {
    offset: u64,
    events: Vec<UsageEvent>,
}

impl JsonlUsageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tail: Mutex::new(Tail::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the whole file; undecodable lines are skipped
    pub fn read_all(&self) -> Result<Vec<UsageEvent>, SourceError> {
        self.ensure_exists()?;
        let bytes = std::fs::read(&self.path)?;
        Ok(bytes
            .split(|b| *b == b'\n')
            .enumerate()
            .filter_map(|(number, raw)| decode_line(raw, number as u64 + 1))
            .collect())
    }

    fn ensure_exists(&self) -> Result<(), SourceError> {
        if self.path.exists() {
            Ok(())
        } else {
            Err(SourceError::Unavailable(format!(
                "{} does not exist",
                self.path.display()
            )))
        }
    }

    /// Complete lines from `offset` on. Returns the events, the offset
    /// actually read from and the offset after the last complete line.
    fn read_from(&self, offset: u64) -> Result<(Vec<UsageEvent>, u64, u64), SourceError> {
        self.ensure_exists()?;
        let mut file = File::open(&self.path)?;
        let start = if file.metadata()?.len() < offset {
            debug!(path = %self.path.display(), "usage log shrank, reading from the start");
            0
        } else {
            offset
        };
        file.seek(SeekFrom::Start(start))?;

        let mut reader = BufReader::new(file);
        let mut events = Vec::new();
        let mut end = start;
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line)?;
            if read == 0 || line.last() != Some(&b'\n') {
                break;
            }
            if let Some(event) = decode_line(&line, end) {
                events.push(event);
            }
            end += read as u64;
        }
        Ok((events, start, end))
    }
}

impl UsageEventSource for JsonlUsageLog {
    fn query_events(&self, start_ms: i64, end_ms: i64) -> Result<Vec<UsageEvent>, SourceError> {
        let mut tail = lock(&self.tail);
        let (fresh, read_from, read_to) = self.read_from(tail.offset)?;
        if read_from < tail.offset {
            tail.events.clear();
        }
        tail.offset = read_to;
        tail.events.extend(fresh);
        tail.events.retain(|e| e.timestamp_ms >= start_ms);
        Ok(in_window(tail.events.iter().cloned(), start_ms, end_ms))
    }
}

/// One raw line, `None` when blank or undecodable. `at` (line number or byte
/// offset) only locates the line in trace output.
fn decode_line(raw: &[u8], at: u64) -> Option<UsageEvent> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text.trim(),
        Err(e) => {
            trace!(at, error = %e, "skipping usage event line that is not UTF-8");
            return None;
        }
    };
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<UsageEvent>(text) {
        Ok(event) => Some(event),
        Err(e) => {
            trace!(at, error = %e, "skipping malformed usage event");
            None
        }
    }
}

/// Window filter plus stable timestamp sort
fn in_window(
    events: impl IntoIterator<Item = UsageEvent>,
    start_ms: i64,
    end_ms: i64,
) -> Vec<UsageEvent> {
    let mut selected: Vec<UsageEvent> = events
        .into_iter()
        .filter(|e| e.timestamp_ms >= start_ms && e.timestamp_ms < end_ms)
        .collect();
    selected.sort_by_key(|e| e.timestamp_ms);
    selected
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
