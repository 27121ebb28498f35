//! Metrics registry
//!
//! Counters only, monotonic, reset on process start. Thread-safe with
//! relaxed atomics; eventual consistency is fine for metrics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics registry containing all operational counters
///
/// # Thread Safety
///
/// All counters use atomic operations for thread-safe increments.
/// Uses Relaxed ordering for minimal overhead.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Index-backed plans chosen
    plans_selected: AtomicU64,
    /// Fetches that fell back to a full scan
    scan_fallbacks: AtomicU64,
    /// Requests sent to the store, counting each retry attempt
    requests_sent: AtomicU64,
    /// Result pages returned from the store
    pages_fetched: AtomicU64,
    /// Items returned across all pages
    items_fetched: AtomicU64,
    /// Throttle retries performed
    throttle_retries: AtomicU64,
    /// Operations abandoned after exhausting the retry schedule
    retries_exhausted: AtomicU64,
    /// Chunked batch-read rounds issued
    batch_rounds: AtomicU64,
    /// Unprocessed-key resubmission rounds
    unprocessed_resubmissions: AtomicU64,
    /// Single-record writes applied
    writes_applied: AtomicU64,
    /// Writes skipped because the key already existed
    conflicts_ignored: AtomicU64,
    /// Records visited by bulk update/delete passes
    bulk_mutations: AtomicU64,
    /// Table metadata cache fills
    metadata_loads: AtomicU64,
    /// Scan cache hits
    scan_cache_hits: AtomicU64,
    /// Scan cache fills
    scan_cache_fills: AtomicU64,
    /// Scan cache invalidations
    scan_cache_invalidations: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Planning metrics

    /// Increment index-backed plans chosen
    pub fn increment_plans_selected(&self) {
        self.plans_selected.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment scan fallbacks
    pub fn increment_scan_fallbacks(&self) {
        self.scan_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    // Fetch metrics

    /// Increment store requests sent
    pub fn increment_requests_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment pages fetched
    pub fn increment_pages_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to items fetched
    pub fn add_items_fetched(&self, count: u64) {
        self.items_fetched.fetch_add(count, Ordering::Relaxed);
    }

    // Retry metrics

    /// Increment throttle retries
    pub fn increment_throttle_retries(&self) {
        self.throttle_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment retries exhausted
    pub fn increment_retries_exhausted(&self) {
        self.retries_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    // Batch metrics

    /// Increment batch-read rounds
    pub fn increment_batch_rounds(&self) {
        self.batch_rounds.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment unprocessed-key resubmissions
    pub fn increment_unprocessed_resubmissions(&self) {
        self.unprocessed_resubmissions.fetch_add(1, Ordering::Relaxed);
    }

    // Write metrics

    /// Increment writes applied
    pub fn increment_writes_applied(&self) {
        self.writes_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment conflicts ignored
    pub fn increment_conflicts_ignored(&self) {
        self.conflicts_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to records visited by bulk mutations
    pub fn add_bulk_mutations(&self, count: u64) {
        self.bulk_mutations.fetch_add(count, Ordering::Relaxed);
    }

    // Cache metrics

    /// Increment metadata cache fills
    pub fn increment_metadata_loads(&self) {
        self.metadata_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment scan cache hits
    pub fn increment_scan_cache_hits(&self) {
        self.scan_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment scan cache fills
    pub fn increment_scan_cache_fills(&self) {
        self.scan_cache_fills.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment scan cache invalidations
    pub fn increment_scan_cache_invalidations(&self) {
        self.scan_cache_invalidations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of all metrics as JSON
    pub fn to_json(&self) -> String {
        format!(
            r#"{{"plans_selected":{},"scan_fallbacks":{},"requests_sent":{},"pages_fetched":{},"items_fetched":{},"throttle_retries":{},"retries_exhausted":{},"batch_rounds":{},"unprocessed_resubmissions":{},"writes_applied":{},"conflicts_ignored":{},"bulk_mutations":{},"metadata_loads":{},"scan_cache_hits":{},"scan_cache_fills":{},"scan_cache_invalidations":{}}}"#,
            self.plans_selected.load(Ordering::Relaxed),
            self.scan_fallbacks.load(Ordering::Relaxed),
            self.requests_sent.load(Ordering::Relaxed),
            self.pages_fetched.load(Ordering::Relaxed),
            self.items_fetched.load(Ordering::Relaxed),
            self.throttle_retries.load(Ordering::Relaxed),
            self.retries_exhausted.load(Ordering::Relaxed),
            self.batch_rounds.load(Ordering::Relaxed),
            self.unprocessed_resubmissions.load(Ordering::Relaxed),
            self.writes_applied.load(Ordering::Relaxed),
            self.conflicts_ignored.load(Ordering::Relaxed),
            self.bulk_mutations.load(Ordering::Relaxed),
            self.metadata_loads.load(Ordering::Relaxed),
            self.scan_cache_hits.load(Ordering::Relaxed),
            self.scan_cache_fills.load(Ordering::Relaxed),
            self.scan_cache_invalidations.load(Ordering::Relaxed),
        )
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            plans_selected: self.plans_selected.load(Ordering::Relaxed),
            scan_fallbacks: self.scan_fallbacks.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            items_fetched: self.items_fetched.load(Ordering::Relaxed),
            throttle_retries: self.throttle_retries.load(Ordering::Relaxed),
            retries_exhausted: self.retries_exhausted.load(Ordering::Relaxed),
            batch_rounds: self.batch_rounds.load(Ordering::Relaxed),
            unprocessed_resubmissions: self.unprocessed_resubmissions.load(Ordering::Relaxed),
            writes_applied: self.writes_applied.load(Ordering::Relaxed),
            conflicts_ignored: self.conflicts_ignored.load(Ordering::Relaxed),
            bulk_mutations: self.bulk_mutations.load(Ordering::Relaxed),
            metadata_loads: self.metadata_loads.load(Ordering::Relaxed),
            scan_cache_hits: self.scan_cache_hits.load(Ordering::Relaxed),
            scan_cache_fills: self.scan_cache_fills.load(Ordering::Relaxed),
            scan_cache_invalidations: self.scan_cache_invalidations.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub plans_selected: u64,
    pub scan_fallbacks: u64,
    pub requests_sent: u64,
    pub pages_fetched: u64,
    pub items_fetched: u64,
    pub throttle_retries: u64,
    pub retries_exhausted: u64,
    pub batch_rounds: u64,
    pub unprocessed_resubmissions: u64,
    pub writes_applied: u64,
    pub conflicts_ignored: u64,
    pub bulk_mutations: u64,
    pub metadata_loads: u64,
    pub scan_cache_hits: u64,
    pub scan_cache_fills: u64,
    pub scan_cache_invalidations: u64,
}
