//! Fetch and mutation execution
//!
//! Everything downstream of a compiled plan: the retrying store client,
//! lazy pagination with cursor following, chunked batch reads, the
//! first-page scan cache, emulated multi-record mutation, and the
//! [`Engine`] facade tying them to the planner and request builder.

mod batch;
mod engine;
mod errors;
mod mutate;
mod pager;
mod query_info;
mod retry;
mod scan_cache;

pub use engine::{Engine, PutOutcome};
pub use errors::{EngineError, EngineResult};
pub use pager::Pages;
pub use query_info::{QueryInfo, QueryInfoRegistry};
pub use retry::RetryingClient;

use crate::store::{StoreClient, StoreRequest, StoreResponse};

/// Sends one request through the retrying client and classifies the
/// outcome.
///
/// The client only returns a retryable error after exhausting its backoff
/// schedule, so that class maps to [`EngineError::RetriesExhausted`];
/// every other error is the store's final word.
pub(crate) fn send_checked(
    client: &dyn StoreClient,
    request: StoreRequest,
) -> EngineResult<StoreResponse> {
    match client.send(request) {
        Ok(response) => Ok(response),
        Err(error) if error.is_retryable() => Err(EngineError::RetriesExhausted(error)),
        Err(error) => Err(EngineError::Store(error)),
    }
}
