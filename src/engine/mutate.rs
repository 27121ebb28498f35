//! Emulated multi-record mutation.
//!
//! The store has no native multi-record update or delete. Both are
//! emulated as a keys-only fetch over the matching records followed by
//! one single-record write per match. The pass is not atomic: records
//! written by others between the fetch and the write can be missed or
//! visited, and a failure partway leaves the earlier writes in place.

use crate::metadata::TableMetadata;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::{Item, StoreClient, StoreRequest, StoreResponse};

use super::errors::{EngineError, EngineResult};
use super::pager::Pages;
use super::send_checked;

/// Applies one write per fetched record and returns how many landed.
///
/// `build` receives each record's full primary key and compiles the
/// write to send. The first failed page, key extraction, compilation or
/// write ends the pass with that error.
pub(crate) fn mutate_fetched(
    pages: Pages,
    client: &dyn StoreClient,
    metrics: &MetricsRegistry,
    metadata: &TableMetadata,
    completion: Event,
    mut build: impl FnMut(Item) -> EngineResult<StoreRequest>,
) -> EngineResult<usize> {
    let mut mutated: usize = 0;
    for page in pages {
        for record in page?.items {
            let key = metadata.primary_key_of(&record).ok_or_else(|| {
                EngineError::KeylessItem {
                    table: metadata.table.clone(),
                }
            })?;
            let request = build(key)?;
            let operation = request.operation_name();
            match send_checked(client, request)? {
                StoreResponse::Mutated => {}
                other => {
                    return Err(EngineError::UnexpectedResponse {
                        operation,
                        kind: other.kind(),
                    })
                }
            }
            metrics.increment_writes_applied();
            mutated += 1;
        }
    }

    metrics.add_bulk_mutations(mutated as u64);
    log_event_with_fields(
        completion,
        &[
            ("table", &metadata.table),
            ("records", &mutated.to_string()),
        ],
    );
    Ok(mutated)
}
