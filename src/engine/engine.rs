//! Engine facade: plan, compile, execute.
//!
//! One value of [`Engine`] owns the retrying store client, the metadata
//! and scan caches, and the metrics registry, and exposes the caller
//! surface: fetch by conditions, single-record writes, and emulated
//! multi-record mutation.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::admin::TableAdmin;
use crate::backoff::{Sleeper, ThreadSleeper};
use crate::config::Config;
use crate::metadata::{MetadataCache, TableMetadata};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::planner::{normalize, AccessPlan, IndexSelector, PlanOperation, ScanPolicy};
use crate::request::{
    build_delete, build_fetch, build_put, build_update, primary_key, BuildError, CallOptions,
    OnConflict, Projection, WriteOptions,
};
use crate::store::{Item, StoreClient, StoreError, StoreRequest, StoreResponse};

use super::errors::{EngineError, EngineResult};
use super::mutate::mutate_fetched;
use super::pager::{CursorRequest, PagePolicy, Pages};
use super::query_info::{QueryInfo, QueryInfoRegistry};
use super::retry::RetryingClient;
use super::scan_cache::ScanCache;
use super::send_checked;

/// How a single-record insert ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome {
    /// The record was written; carries the record as submitted
    Applied(Item),
    /// The key already existed and the collision was configured away;
    /// carries the colliding primary key
    ConflictIgnored(Item),
}

/// Which attributes a planned fetch reads back.
enum FetchShape {
    Full,
    KeysOnly,
}

/// Adapter core for one store endpoint.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Engine {
    client: Arc<dyn StoreClient>,
    config: Config,
    sleeper: Arc<dyn Sleeper>,
    metadata: MetadataCache,
    scan_cache: ScanCache,
    query_info: Arc<QueryInfoRegistry>,
    metrics: Arc<MetricsRegistry>,
}

impl Engine {
    /// Wraps `client` in throttle retry and builds the shared caches.
    pub fn new(client: Arc<dyn StoreClient>, config: Config) -> Self {
        Engine::with_sleeper(client, config, Arc::new(ThreadSleeper))
    }

    /// Like [`Engine::new`] with an injected sleeper for the retry and
    /// schema-polling waits.
    pub fn with_sleeper(
        client: Arc<dyn StoreClient>,
        config: Config,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let retrying: Arc<dyn StoreClient> = Arc::new(RetryingClient::new(
            client,
            config.backoff,
            Arc::clone(&sleeper),
            Arc::clone(&metrics),
        ));
        Engine {
            metadata: MetadataCache::new(Arc::clone(&retrying), Arc::clone(&metrics)),
            scan_cache: ScanCache::new(Arc::clone(&metrics)),
            query_info: Arc::new(QueryInfoRegistry::new()),
            client: retrying,
            config,
            sleeper,
            metrics,
        }
    }

    /// Fetches every record matching `conditions`, fully drained across
    /// pages per the options' paging policy.
    pub fn fetch(
        &self,
        table: &str,
        conditions: impl IntoIterator<Item = (String, JsonValue)>,
        options: &CallOptions,
    ) -> EngineResult<Vec<Item>> {
        self.fetch_pages(table, conditions, options)?.collect_items()
    }

    /// Plans and compiles a fetch, returning its lazy page iterator.
    /// Nothing is sent until the iterator is advanced.
    pub fn fetch_pages(
        &self,
        table: &str,
        conditions: impl IntoIterator<Item = (String, JsonValue)>,
        options: &CallOptions,
    ) -> EngineResult<Pages> {
        let (_, pages) = self.planned_pages(table, conditions, options, FetchShape::Full)?;
        Ok(pages)
    }

    /// Writes one record, keyed by its own attributes.
    ///
    /// Unless overwrite is configured the write is conditional on key
    /// absence; a collision follows `WriteOptions::on_conflict`.
    pub fn put(
        &self,
        table: &str,
        record: Item,
        options: &WriteOptions,
    ) -> EngineResult<PutOutcome> {
        let metadata = self.metadata.get(table)?;
        let request = build_put(&metadata, record.clone(), options)?;
        match send_checked(self.client.as_ref(), request) {
            Ok(StoreResponse::Mutated) => {
                self.metrics.increment_writes_applied();
                log_event_with_fields(Event::PutApplied, &[("table", table)]);
                Ok(PutOutcome::Applied(record))
            }
            Ok(other) => Err(EngineError::UnexpectedResponse {
                operation: "put_item",
                kind: other.kind(),
            }),
            Err(EngineError::Store(StoreError::ConditionalCheckFailed { .. }))
                if options.on_conflict == OnConflict::Nothing =>
            {
                self.metrics.increment_conflicts_ignored();
                log_event_with_fields(Event::PutConflictIgnored, &[("table", table)]);
                let key = metadata.primary_key_of(&record).ok_or_else(|| {
                    EngineError::KeylessItem {
                        table: table.to_string(),
                    }
                })?;
                Ok(PutOutcome::ConflictIgnored(key))
            }
            Err(error) => Err(error),
        }
    }

    /// Updates one record in place. The primary key is taken from
    /// `record`, with `WriteOptions::range_key` filling a missing sort
    /// key.
    pub fn update_item(
        &self,
        table: &str,
        record: &Item,
        changes: Item,
        options: &WriteOptions,
    ) -> EngineResult<()> {
        let metadata = self.metadata.get(table)?;
        let key = primary_key(&metadata, record, options.range_key.as_ref())?;
        let request = build_update(&metadata, key, changes, options)?;
        self.apply_write(request, Event::UpdateApplied, "update_item", table)
    }

    /// Deletes one record. Key derivation follows [`Engine::update_item`].
    pub fn delete_item(
        &self,
        table: &str,
        record: &Item,
        options: &WriteOptions,
    ) -> EngineResult<()> {
        let metadata = self.metadata.get(table)?;
        let key = primary_key(&metadata, record, options.range_key.as_ref())?;
        let request = build_delete(&metadata, key)?;
        self.apply_write(request, Event::DeleteApplied, "delete_item", table)
    }

    /// Applies `changes` to every record matching `conditions` and
    /// returns how many were updated.
    ///
    /// Emulated as a keys-only fetch plus one update per match; see the
    /// mutation module for the atomicity caveats.
    pub fn update_all(
        &self,
        table: &str,
        conditions: impl IntoIterator<Item = (String, JsonValue)>,
        changes: &Item,
        options: &CallOptions,
        write: &WriteOptions,
    ) -> EngineResult<usize> {
        let call = bulk_call(options);
        let (metadata, pages) = self.planned_pages(table, conditions, &call, FetchShape::KeysOnly)?;
        mutate_fetched(
            pages,
            self.client.as_ref(),
            &self.metrics,
            &metadata,
            Event::BulkUpdateComplete,
            |key| Ok(build_update(&metadata, key, changes.clone(), write)?),
        )
    }

    /// Deletes every record matching `conditions` and returns how many
    /// were removed. Same emulation and caveats as [`Engine::update_all`].
    pub fn delete_all(
        &self,
        table: &str,
        conditions: impl IntoIterator<Item = (String, JsonValue)>,
        options: &CallOptions,
    ) -> EngineResult<usize> {
        let call = bulk_call(options);
        let (metadata, pages) = self.planned_pages(table, conditions, &call, FetchShape::KeysOnly)?;
        mutate_fetched(
            pages,
            self.client.as_ref(),
            &self.metrics,
            &metadata,
            Event::BulkDeleteComplete,
            |key| Ok(build_delete(&metadata, key)?),
        )
    }

    /// Cached key structure of `table`, described on first use.
    pub fn table_metadata(&self, table: &str) -> EngineResult<Arc<TableMetadata>> {
        Ok(self.metadata.get(table)?)
    }

    /// Redescribes `table` so schema changes become visible to planning.
    pub fn refresh_table_metadata(&self, table: &str) -> EngineResult<Arc<TableMetadata>> {
        Ok(self.metadata.refresh(table)?)
    }

    /// Drops the cached scan for `table`; the next eligible fetch
    /// rescans.
    pub fn invalidate_scan_cache(&self, table: &str) -> EngineResult<()> {
        self.scan_cache.invalidate(table)
    }

    /// Collects the fetch bookkeeping recorded under `key`, at most once.
    pub fn query_info(&self, key: &str) -> Option<QueryInfo> {
        self.query_info.take(key)
    }

    /// Counter registry shared by every operation of this engine.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Schema administration bound to this engine's client and backoff
    /// schedule.
    pub fn table_admin(&self) -> TableAdmin {
        TableAdmin::new(
            Arc::clone(&self.client),
            self.config.backoff,
            Arc::clone(&self.sleeper),
        )
    }

    fn planned_pages(
        &self,
        table: &str,
        conditions: impl IntoIterator<Item = (String, JsonValue)>,
        options: &CallOptions,
        shape: FetchShape,
    ) -> EngineResult<(Arc<TableMetadata>, Pages)> {
        let metadata = self.metadata.get(table)?;
        let predicates = normalize(conditions)?;
        let scan_policy = ScanPolicy::new(options.scan || self.config.is_scannable(table));
        let plan = IndexSelector::new(&metadata).plan(&predicates, scan_policy)?;

        if plan.is_scan() {
            self.metrics.increment_scan_fallbacks();
            log_event_with_fields(
                Event::ScanFallback,
                &[
                    ("table", table),
                    ("residual_filters", &plan.residual_filters.len().to_string()),
                ],
            );
        } else {
            self.metrics.increment_plans_selected();
            log_event_with_fields(
                Event::PlanSelected,
                &[
                    ("table", table),
                    ("operation", plan.operation.as_str()),
                    ("index", plan.index_label()),
                    ("residual_filters", &plan.residual_filters.len().to_string()),
                ],
            );
        }
        log_event_with_fields(
            Event::FetchBegin,
            &[("table", table), ("operation", plan.operation.as_str())],
        );

        if self.scan_cache_eligible(&plan, options, &shape) {
            let entry = self.scan_cache.get_or_fill(table, || {
                let request = build_fetch(&plan, options, &Projection::Full)?;
                match send_checked(self.client.as_ref(), request)? {
                    StoreResponse::Page(page) => {
                        self.metrics.increment_pages_fetched();
                        self.metrics.add_items_fetched(page.count as u64);
                        Ok(page)
                    }
                    other => Err(EngineError::UnexpectedResponse {
                        operation: "scan",
                        kind: other.kind(),
                    }),
                }
            })?;
            let pages = Pages::preloaded(
                Arc::clone(&self.client),
                Arc::clone(&self.metrics),
                entry.page.clone(),
                table.to_string(),
            );
            return Ok((metadata, self.attach_query_info(pages, options)));
        }

        let projection = match shape {
            FetchShape::Full => Projection::Full,
            FetchShape::KeysOnly => Projection::Attributes(key_attributes(&metadata)),
        };
        let request = build_fetch(&plan, options, &projection)?;
        let paging = PagePolicy::for_fetch(plan.operation, options);
        let client = Arc::clone(&self.client);
        let metrics = Arc::clone(&self.metrics);
        let pages = match request {
            request @ StoreRequest::PointGet(_) => Pages::single(client, metrics, request),
            StoreRequest::BatchGet(batch) => {
                Pages::batched(client, metrics, batch, self.config.batch_retry_ceiling)
            }
            StoreRequest::Query(query) => {
                Pages::cursored(client, metrics, CursorRequest::Query(query), paging)
            }
            StoreRequest::Scan(scan) => {
                Pages::cursored(client, metrics, CursorRequest::Scan(scan), paging)
            }
            _ => {
                return Err(EngineError::Build(BuildError::MalformedPlan {
                    table: table.to_string(),
                    reason: "fetch compiled to a non-read request",
                }))
            }
        };
        Ok((metadata, self.attach_query_info(pages, options)))
    }

    /// Only a plain first-page scan of a configured table is served from
    /// the scan cache; any option that changes the page's shape or
    /// position bypasses it.
    fn scan_cache_eligible(
        &self,
        plan: &AccessPlan,
        options: &CallOptions,
        shape: &FetchShape,
    ) -> bool {
        matches!(shape, FetchShape::Full)
            && plan.operation == PlanOperation::Scan
            && plan.residual_filters.is_empty()
            && self.config.is_cached(&plan.table)
            && options.scan_limit.is_none()
            && options.exclusive_start_key.is_none()
            && options.page_limit.is_none()
            && options.recursive.is_none()
            && !options.consistent_read
    }

    fn attach_query_info(&self, pages: Pages, options: &CallOptions) -> Pages {
        match &options.query_info_key {
            Some(key) => pages.with_query_info(Arc::clone(&self.query_info), key.clone()),
            None => pages,
        }
    }

    fn apply_write(
        &self,
        request: StoreRequest,
        event: Event,
        operation: &'static str,
        table: &str,
    ) -> EngineResult<()> {
        match send_checked(self.client.as_ref(), request)? {
            StoreResponse::Mutated => {
                self.metrics.increment_writes_applied();
                log_event_with_fields(event, &[("table", table)]);
                Ok(())
            }
            other => Err(EngineError::UnexpectedResponse {
                operation,
                kind: other.kind(),
            }),
        }
    }
}

/// Bulk passes must visit every match, so paging defaults to recursive
/// even for scans.
fn bulk_call(options: &CallOptions) -> CallOptions {
    let mut call = options.clone();
    call.recursive = Some(options.recursive.unwrap_or(true));
    call
}

fn key_attributes(metadata: &TableMetadata) -> Vec<String> {
    let mut attributes = vec![metadata.primary.hash_attribute.clone()];
    if let Some(range) = &metadata.primary.range_attribute {
        attributes.push(range.clone());
    }
    attributes
}
