//! Set of process identifiers to intercept

use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};

/// Locked process identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockSet {
    packages: BTreeSet<String>,
}

impl LockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the persisted comma-joined form. Empty segments are dropped.
    pub fn from_persisted(raw: &str) -> Self {
        raw.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Comma-joined form for the key-value store
    pub fn to_persisted(&self) -> String {
        self.packages
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn contains(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    pub fn insert(&mut self, package: impl Into<String>) -> bool {
        self.packages.insert(package.into())
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.packages.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for LockSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = LockSet::new();
        for package in iter {
            let package: String = package.into();
            let package = package.trim();
            if !package.is_empty() {
                set.insert(package);
            }
        }
        set
    }
}
