//! Engine error types.

use thiserror::Error;

use crate::cache::CacheError;
use crate::metadata::MetadataError;
use crate::planner::PlanError;
use crate::request::BuildError;
use crate::store::StoreError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Everything a fetch or mutation can fail with. Wrapped variants keep
/// their source kind so callers can tell caller mistakes from transient
/// store failures by matching, not by parsing messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Index selection failed
    #[error("{0}")]
    Plan(#[from] PlanError),

    /// Request compilation failed
    #[error("{0}")]
    Build(#[from] BuildError),

    /// Table metadata could not be loaded
    #[error("{0}")]
    Metadata(#[from] MetadataError),

    /// The store rejected the request with a non-retryable error
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Cache coordination failed
    #[error("{0}")]
    Cache(#[from] CacheError),

    /// A retryable store error survived the full backoff schedule
    #[error("Retries exhausted at the backoff ceiling: {0}")]
    RetriesExhausted(StoreError),

    /// A batch read kept reporting unprocessed keys past the retry
    /// ceiling
    #[error(
        "Batch read on table '{table}' still had {remaining} unprocessed keys after {rounds} resubmissions"
    )]
    BatchRetriesExhausted {
        /// Table being read
        table: String,
        /// Keys never delivered
        remaining: usize,
        /// Resubmission rounds performed
        rounds: u32,
    },

    /// The store answered with a payload of the wrong shape
    #[error("Store returned '{kind}' payload for {operation}")]
    UnexpectedResponse {
        /// Operation that was issued
        operation: &'static str,
        /// Payload kind actually returned
        kind: &'static str,
    },

    /// A bulk-mutation page returned an item without its full primary key
    #[error("Bulk mutation on table '{table}' read an item missing primary key attributes")]
    KeylessItem {
        /// Table being mutated
        table: String,
    },
}
