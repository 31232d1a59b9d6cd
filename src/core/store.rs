//! Key-value persistence for the lock set and run flag
//!
//! Whole-value writes are atomic: readers see either the old or the new
//! string, never a mix.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use crate::types::{LockSet, StoreError};
use crate::{KEY_APP_DATA, KEY_IS_STOPPED, RUNNING_VALUE, STOPPED_VALUE};

/// String-keyed store shared with the control plane
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Volatile store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|p| p.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().unwrap_or_else(|p| p.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, rewritten through a temp file and rename on every set
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store, starting empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(values)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        let mut next = values.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *values = next;
        Ok(())
    }
}

/// Typed view over the persisted `app_data` / `is_stopped` keys
#[derive(Clone)]
pub struct Prefs {
    store: Arc<dyn KeyValueStore>,
}

impl Prefs {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persisted lock set, empty when never written
    pub fn lock_set(&self) -> LockSet {
        self.store
            .get(KEY_APP_DATA)
            .map(|raw| LockSet::from_persisted(&raw))
            .unwrap_or_default()
    }

    pub fn save_lock_set(&self, lock_set: &LockSet) -> Result<(), StoreError> {
        self.store.set(KEY_APP_DATA, &lock_set.to_persisted())
    }

    /// Run flag, inverted. Anything but "0" counts as stopped; absent is stopped.
    pub fn is_stopped(&self) -> bool {
        self.store.get(KEY_IS_STOPPED).as_deref() != Some(RUNNING_VALUE)
    }

    pub fn set_stopped(&self, stopped: bool) -> Result<(), StoreError> {
        let value = if stopped { STOPPED_VALUE } else { RUNNING_VALUE };
        self.store.set(KEY_IS_STOPPED, value)
    }
}
