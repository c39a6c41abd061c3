//! Per-application time counters.
//!
//! App names come straight from window metadata, so every key goes through
//! [`sanitize_app_key`] before it reaches storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const UNKNOWN_APP: &str = "unknown";

/// Maps an arbitrary app name onto a storage-safe key.
///
/// Dots act as path separators and a leading `$` marks operators in mapping
/// representations, so both are replaced with `_`. Control characters are
/// dropped.
pub fn sanitize_app_key(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '.' { '_' } else { c })
        .collect();

    let cleaned = match cleaned.strip_prefix('$') {
        Some(rest) => format!("_{rest}"),
        None => cleaned,
    };

    if cleaned.trim().is_empty() {
        UNKNOWN_APP.to_string()
    } else {
        cleaned
    }
}

/// Seconds spent per sanitized app key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppUsage(BTreeMap<String, u64>);

impl AppUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `seconds` under the sanitized form of `app_name` and returns the key used.
    pub fn add(&mut self, app_name: &str, seconds: u64) -> String {
        let key = sanitize_app_key(app_name);
        let entry = self.0.entry(key.clone()).or_insert(0);
        *entry = entry.saturating_add(seconds);
        key
    }

    /// Inserts a value loaded from storage; the key is already sanitized.
    pub(crate) fn insert_stored(&mut self, key: String, seconds: u64) {
        self.0.insert(key, seconds);
    }

    pub fn get(&self, app_name: &str) -> u64 {
        self.0
            .get(&sanitize_app_key(app_name))
            .copied()
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(key, secs)| (key.as_str(), *secs))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_seconds(&self) -> u64 {
        self.0.values().sum()
    }
}
