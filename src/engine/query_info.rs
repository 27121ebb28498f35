//! Take-once registry for per-fetch result metadata.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::store::Item;

/// Result bookkeeping for one finished fetch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryInfo {
    /// Items returned across all pages, after store-side filtering
    pub count: usize,
    /// Items the store examined across all pages
    pub scanned_count: usize,
    /// Cursor of the final page; `Some` means results remained
    pub last_key: Option<Item>,
    /// Pages fetched
    pub pages: usize,
}

/// Holds [`QueryInfo`] under caller-chosen keys until collected.
///
/// Each entry is delivered exactly once: `take` removes it. A poisoned
/// lock reads as an empty registry.
#[derive(Debug, Default)]
pub struct QueryInfoRegistry {
    entries: Mutex<HashMap<String, QueryInfo>>,
}

impl QueryInfoRegistry {
    pub fn new() -> Self {
        QueryInfoRegistry::default()
    }

    /// Stores `info` under `key`, replacing any uncollected entry.
    pub fn record(&self, key: &str, info: QueryInfo) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), info);
        }
    }

    /// Removes and returns the entry under `key`.
    pub fn take(&self, key: &str) -> Option<QueryInfo> {
        self.entries.lock().ok()?.remove(key)
    }
}
