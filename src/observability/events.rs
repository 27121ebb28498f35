//! Observable adapter events
//!
//! Every externally visible action the adapter takes maps to one typed
//! event, logged as a single structured line.

use std::fmt;

/// Observable events in the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Configuration loaded
    ConfigLoaded,

    // Table metadata
    /// Table metadata fetched and cached
    MetadataLoaded,
    /// Table metadata refetched on request
    MetadataRefreshed,

    // Planning
    /// An index-backed plan was chosen for a fetch
    PlanSelected,
    /// No index matched; the fetch fell back to a full scan
    ScanFallback,

    // Fetch execution
    /// A fetch operation begins
    FetchBegin,
    /// One page of results returned from the store
    PageFetched,
    /// A fetch operation finished
    FetchComplete,
    /// One round of a chunked batch read
    BatchGetRound,
    /// Batch read gave up resubmitting unprocessed keys
    BatchRetryExceeded,

    // Single-record writes
    /// Record written
    PutApplied,
    /// Record write skipped because the key already existed
    PutConflictIgnored,
    /// Record updated in place
    UpdateApplied,
    /// Record deleted
    DeleteApplied,

    // Multi-record writes
    /// Fetch-then-update pass over matching records finished
    BulkUpdateComplete,
    /// Fetch-then-delete pass over matching records finished
    BulkDeleteComplete,

    // Retry
    /// Throttled request; sleeping before the next attempt
    ThrottleWait,
    /// Retry schedule exhausted without success
    RetryExhausted,

    // Scan cache
    /// Cached scan result served without touching the store
    ScanCacheHit,
    /// Full scan stored in the scan cache
    ScanCacheFilled,
    /// Scan cache entry dropped
    ScanCacheInvalidated,

    // Table administration
    /// Table creation issued
    TableCreateBegin,
    /// Table change issued
    TableUpdateBegin,
    /// Table deletion issued
    TableDeleteBegin,
    /// Waiting for a schema change to finish
    TablePollWait,
    /// Table reached active status
    TableActive,
    /// Table never became active within the wait ceiling
    TableActivationFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::MetadataLoaded => "TABLE_METADATA_LOADED",
            Event::MetadataRefreshed => "TABLE_METADATA_REFRESHED",

            Event::PlanSelected => "PLAN_SELECTED",
            Event::ScanFallback => "SCAN_FALLBACK",

            Event::FetchBegin => "FETCH_BEGIN",
            Event::PageFetched => "PAGE_FETCHED",
            Event::FetchComplete => "FETCH_COMPLETE",
            Event::BatchGetRound => "BATCH_GET_ROUND",
            Event::BatchRetryExceeded => "BATCH_RETRY_EXCEEDED",

            Event::PutApplied => "PUT_APPLIED",
            Event::PutConflictIgnored => "PUT_CONFLICT_IGNORED",
            Event::UpdateApplied => "UPDATE_APPLIED",
            Event::DeleteApplied => "DELETE_APPLIED",

            Event::BulkUpdateComplete => "BULK_UPDATE_COMPLETE",
            Event::BulkDeleteComplete => "BULK_DELETE_COMPLETE",

            Event::ThrottleWait => "THROTTLE_WAIT",
            Event::RetryExhausted => "RETRY_EXHAUSTED",

            Event::ScanCacheHit => "SCAN_CACHE_HIT",
            Event::ScanCacheFilled => "SCAN_CACHE_FILLED",
            Event::ScanCacheInvalidated => "SCAN_CACHE_INVALIDATED",

            Event::TableCreateBegin => "TABLE_CREATE_BEGIN",
            Event::TableUpdateBegin => "TABLE_UPDATE_BEGIN",
            Event::TableDeleteBegin => "TABLE_DELETE_BEGIN",
            Event::TablePollWait => "TABLE_POLL_WAIT",
            Event::TableActive => "TABLE_ACTIVE",
            Event::TableActivationFailed => "TABLE_ACTIVATION_FAILED",
        }
    }

    /// Returns true if this event reports an operation failure
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Event::BatchRetryExceeded | Event::RetryExhausted | Event::TableActivationFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
