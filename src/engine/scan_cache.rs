//! Cached whole-table scan results.
//!
//! Tables named in `cached_tables` keep the first page of their scan in
//! memory after the first fetch. Only that single page is ever cached,
//! never a recursively drained result. Entries never expire on their own;
//! staleness is accepted until a caller invalidates the table explicitly.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cache::TableCache;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::Page;

use super::errors::{EngineError, EngineResult};

/// One cached scan: the first result page plus its capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanCacheEntry {
    /// First page of the scan; its cursor, if any, is preserved
    pub page: Page,
    /// When the scan that produced this entry ran
    pub captured_at: DateTime<Utc>,
}

/// Table-keyed cache of first-page scan results.
///
/// Fill coordination comes from [`TableCache`]: concurrent misses on one
/// table run a single scan, misses on different tables scan in parallel.
pub struct ScanCache {
    entries: TableCache<Arc<ScanCacheEntry>>,
    metrics: Arc<MetricsRegistry>,
}

impl ScanCache {
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            entries: TableCache::new(),
            metrics,
        }
    }

    /// Returns the cached scan for `table`, running `fill` on a miss.
    ///
    /// `fill` performs one scan round-trip and returns its first page.
    pub fn get_or_fill(
        &self,
        table: &str,
        fill: impl FnOnce() -> EngineResult<Page>,
    ) -> EngineResult<Arc<ScanCacheEntry>> {
        let mut filled = false;
        let entry = self.entries.get_or_fill(table, || {
            let page = fill()?;
            filled = true;
            Ok::<_, EngineError>(Arc::new(ScanCacheEntry {
                page,
                captured_at: Utc::now(),
            }))
        })?;

        if filled {
            self.metrics.increment_scan_cache_fills();
            log_event_with_fields(Event::ScanCacheFilled, &[("table", table)]);
        } else {
            self.metrics.increment_scan_cache_hits();
            log_event_with_fields(Event::ScanCacheHit, &[("table", table)]);
        }
        Ok(entry)
    }

    /// Drops the cached scan for `table`; the next fetch refills it.
    pub fn invalidate(&self, table: &str) -> EngineResult<()> {
        if self.entries.invalidate(table)?.is_some() {
            self.metrics.increment_scan_cache_invalidations();
            log_event_with_fields(Event::ScanCacheInvalidated, &[("table", table)]);
        }
        Ok(())
    }
}
