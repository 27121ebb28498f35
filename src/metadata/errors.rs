//! Metadata error types

use thiserror::Error;

use crate::cache::CacheError;
use crate::store::StoreError;

/// Result type for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors raised while loading or interpreting table metadata
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetadataError {
    /// A key attribute has no declared type in the table description
    #[error("Table '{table}' declares key attribute '{attribute}' without a type definition")]
    MissingAttributeDefinition {
        /// Table being described
        table: String,
        /// Key attribute lacking a declared type
        attribute: String,
    },

    /// The store answered with a payload of the wrong shape
    #[error("Store returned '{kind}' payload for {operation}")]
    UnexpectedResponse {
        /// Operation that was issued
        operation: &'static str,
        /// Payload kind actually returned
        kind: &'static str,
    },

    /// The store call itself failed
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Cache coordination failed
    #[error("{0}")]
    Cache(#[from] CacheError),
}
