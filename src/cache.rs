//! Table-keyed cache with single-writer fills
//!
//! Shared by the table-metadata cache and the scan-result cache. Reads go
//! through an `RwLock` so a value is either absent or complete, never
//! partially written. Fills are coordinated per table: when several
//! threads miss on the same table at once, exactly one runs the fetch and
//! the rest block until the value lands, then read it from the map.
//! Different tables fill independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;

/// Cache coordination errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    /// A lock guard was poisoned by a panic in another thread
    #[error("Cache lock poisoned for table '{0}'")]
    Poisoned(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Map from table name to a cached value of type `T`
pub struct TableCache<T> {
    values: RwLock<HashMap<String, T>>,
    fills: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<T> Default for TableCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TableCache<T> {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            fills: Mutex::new(HashMap::new()),
        }
    }

    /// Per-table mutex serializing fills for that table only
    fn fill_lock(&self, table: &str) -> CacheResult<Arc<Mutex<()>>> {
        let mut fills = self
            .fills
            .lock()
            .map_err(|_| CacheError::Poisoned(table.to_string()))?;
        Ok(Arc::clone(
            fills
                .entry(table.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        ))
    }
}

impl<T: Clone> TableCache<T> {
    /// Returns the cached value for `table`, if any
    pub fn get(&self, table: &str) -> CacheResult<Option<T>> {
        let values = self
            .values
            .read()
            .map_err(|_| CacheError::Poisoned(table.to_string()))?;
        Ok(values.get(table).cloned())
    }

    /// Stores `value` for `table`, replacing any previous entry
    pub fn insert(&self, table: &str, value: T) -> CacheResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| CacheError::Poisoned(table.to_string()))?;
        values.insert(table.to_string(), value);
        Ok(())
    }

    /// Drops the entry for `table`, returning the evicted value
    pub fn invalidate(&self, table: &str) -> CacheResult<Option<T>> {
        let mut values = self
            .values
            .write()
            .map_err(|_| CacheError::Poisoned(table.to_string()))?;
        Ok(values.remove(table))
    }

    /// Drops every entry
    pub fn clear(&self) -> CacheResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| CacheError::Poisoned("*".to_string()))?;
        values.clear();
        Ok(())
    }

    /// Returns the cached value for `table`, running `fill` to produce it
    /// on a miss.
    ///
    /// At most one `fill` runs per table at a time; concurrent callers
    /// block on the same table's fill and then read the stored value. A
    /// failed fill stores nothing, so the next caller retries.
    pub fn get_or_fill<E>(
        &self,
        table: &str,
        fill: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<CacheError>,
    {
        if let Some(value) = self.get(table)? {
            return Ok(value);
        }

        let lock = self.fill_lock(table)?;
        let _guard = lock
            .lock()
            .map_err(|_| CacheError::Poisoned(table.to_string()))?;

        // Another caller may have filled while this one waited.
        if let Some(value) = self.get(table)? {
            return Ok(value);
        }

        let value = fill()?;
        self.insert(table, value.clone())?;
        Ok(value)
    }
}
