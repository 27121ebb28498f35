//! Store error taxonomy
//!
//! Every store call returns a typed error. The throttled/limit-exceeded
//! class is the only one the retry loop is allowed to re-attempt; all
//! other kinds surface immediately.

use thiserror::Error;

/// Result type for store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Typed failure returned by the store client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Request rejected because provisioned throughput was exceeded
    #[error("throttled: {0}")]
    Throttled(String),

    /// Request rejected because an account/table limit was exceeded
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// A conditional write's condition evaluated to false
    #[error("conditional check failed on table '{table}'")]
    ConditionalCheckFailed {
        /// Table the write targeted
        table: String,
    },

    /// Table or index does not exist
    #[error("resource '{0}' not found")]
    ResourceNotFound(String),

    /// Table is being created/updated/deleted and cannot accept this call
    #[error("resource '{0}' in use")]
    ResourceInUse(String),

    /// Request shape rejected by the store
    #[error("validation: {0}")]
    Validation(String),

    /// Any other store-side failure
    #[error("store failure: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns true for the transient class the backoff loop may retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Throttled(_) | StoreError::LimitExceeded(_)
        )
    }

    /// Returns the error kind name used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Throttled(_) => "throttled",
            StoreError::LimitExceeded(_) => "limit_exceeded",
            StoreError::ConditionalCheckFailed { .. } => "conditional_check_failed",
            StoreError::ResourceNotFound(_) => "resource_not_found",
            StoreError::ResourceInUse(_) => "resource_in_use",
            StoreError::Validation(_) => "validation",
            StoreError::Internal(_) => "internal",
        }
    }
}
