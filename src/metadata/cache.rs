//! Cached table-metadata loader
//!
//! Table key structure changes rarely, so each table is described once
//! and the flattened metadata is reused until explicitly refreshed.
//! Concurrent first reads of the same table trigger a single describe
//! call; the table cache coordinates that.

use std::sync::Arc;

use crate::cache::TableCache;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::{StoreClient, StoreRequest, StoreResponse};

use super::errors::{MetadataError, MetadataResult};
use super::types::TableMetadata;

/// Loads and caches [`TableMetadata`] per table
pub struct MetadataCache {
    client: Arc<dyn StoreClient>,
    metrics: Arc<MetricsRegistry>,
    cache: TableCache<Arc<TableMetadata>>,
}

impl MetadataCache {
    pub fn new(client: Arc<dyn StoreClient>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            client,
            metrics,
            cache: TableCache::new(),
        }
    }

    /// Returns the metadata for `table`, describing it on first use
    pub fn get(&self, table: &str) -> MetadataResult<Arc<TableMetadata>> {
        self.cache.get_or_fill(table, || self.load(table))
    }

    /// Drops any cached entry and describes the table again.
    ///
    /// Use after a schema change so new indexes become plannable.
    pub fn refresh(&self, table: &str) -> MetadataResult<Arc<TableMetadata>> {
        self.cache.invalidate(table)?;
        let metadata = self.cache.get_or_fill(table, || self.load(table))?;
        log_event_with_fields(Event::MetadataRefreshed, &[("table", table)]);
        Ok(metadata)
    }

    /// Drops any cached entry without reloading
    pub fn invalidate(&self, table: &str) -> MetadataResult<()> {
        self.cache.invalidate(table)?;
        Ok(())
    }

    fn load(&self, table: &str) -> MetadataResult<Arc<TableMetadata>> {
        let response = self
            .client
            .send(StoreRequest::DescribeTable(table.to_string()))?;
        let StoreResponse::Table(description) = response else {
            return Err(MetadataError::UnexpectedResponse {
                operation: "describe_table",
                kind: response.kind(),
            });
        };

        let metadata = TableMetadata::from_description(&description)?;
        self.metrics.increment_metadata_loads();
        log_event_with_fields(Event::MetadataLoaded, &[("table", table)]);
        Ok(Arc::new(metadata))
    }
}
