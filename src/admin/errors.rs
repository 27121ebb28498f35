//! Table administration errors.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for administrative operations
pub type AdminResult<T> = Result<T, AdminError>;

/// Failures of schema-changing calls and their activation polling
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdminError {
    /// The store rejected an administrative call
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The table never reached active status within the polling ceiling.
    /// The issued change itself stays in flight at the store.
    #[error("Table '{table}' still not active after {waited_ms}ms of polling")]
    ActivationTimeout {
        /// Table being polled
        table: String,
        /// Total milliseconds slept before giving up
        waited_ms: u64,
    },

    /// The store answered with a payload of the wrong shape
    #[error("Store returned '{kind}' payload for {operation}")]
    UnexpectedResponse {
        /// Operation that was issued
        operation: &'static str,
        /// Payload kind actually returned
        kind: &'static str,
    },
}
