//! Store client seam
//!
//! The wire client (serialization, HTTP, endpoint selection, call-level
//! timeouts) lives outside this core. Everything here talks to the store
//! through this one blocking trait.

use super::errors::StoreResult;
use super::request::StoreRequest;
use super::response::StoreResponse;

/// Abstract transport to the partitioned store.
///
/// Implementations are expected to be cheap to share (`Send + Sync`) so one
/// client can serve concurrent caller operations. Each call performs one
/// blocking round-trip; the core never issues overlapping calls within a
/// single caller operation.
pub trait StoreClient: Send + Sync {
    /// Execute one store operation and return its typed payload or error
    fn send(&self, request: StoreRequest) -> StoreResult<StoreResponse>;
}
