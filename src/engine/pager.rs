//! Lazy page iteration over a compiled fetch.
//!
//! A [`Pages`] value sends nothing until iterated; each `next` call is at
//! most one store round-trip (plus the retries hidden inside the client).
//! Keyed reads follow resume cursors to exhaustion by default, scans stop
//! after one page unless told otherwise, and an explicit page limit wins
//! over both.

use std::sync::Arc;

use uuid::Uuid;

use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::planner::PlanOperation;
use crate::request::CallOptions;
use crate::store::{
    BatchGetRequest, Item, Page, QueryRequest, ScanRequest, StoreClient, StoreRequest,
    StoreResponse,
};

use super::batch::BatchFetch;
use super::errors::{EngineError, EngineResult};
use super::query_info::{QueryInfo, QueryInfoRegistry};
use super::send_checked;

/// When to fetch the next page of a cursored read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PagePolicy {
    recursive: bool,
    page_limit: Option<usize>,
}

impl PagePolicy {
    /// Policy for one fetch: keyed reads page to exhaustion, scans stop
    /// after one page, and the caller's options override either default.
    pub(crate) fn for_fetch(operation: PlanOperation, options: &CallOptions) -> Self {
        let recursive = options
            .recursive
            .unwrap_or(operation != PlanOperation::Scan);
        PagePolicy {
            recursive,
            page_limit: options.page_limit,
        }
    }

    fn allows(&self, pages_yielded: usize, has_more: bool) -> bool {
        match self.page_limit {
            Some(limit) => has_more && pages_yielded < limit,
            None => has_more && self.recursive,
        }
    }
}

/// A read request that can carry a resume cursor between pages.
#[derive(Debug, Clone)]
pub(crate) enum CursorRequest {
    Query(QueryRequest),
    Scan(ScanRequest),
}

impl CursorRequest {
    fn to_store_request(&self) -> StoreRequest {
        match self {
            CursorRequest::Query(request) => StoreRequest::Query(request.clone()),
            CursorRequest::Scan(request) => StoreRequest::Scan(request.clone()),
        }
    }

    fn set_cursor(&mut self, cursor: Option<Item>) {
        match self {
            CursorRequest::Query(request) => request.exclusive_start_key = cursor,
            CursorRequest::Scan(request) => request.exclusive_start_key = cursor,
        }
    }

    fn table(&self) -> &str {
        match self {
            CursorRequest::Query(request) => &request.table,
            CursorRequest::Scan(request) => &request.table,
        }
    }

    fn operation_name(&self) -> &'static str {
        match self {
            CursorRequest::Query(_) => "query",
            CursorRequest::Scan(_) => "scan",
        }
    }
}

enum PagerState {
    /// Single-item read not yet sent
    Point(StoreRequest),
    /// Chunked batch read in progress
    Batch(BatchFetch),
    /// Cursored read positioned at the next page
    Cursor(CursorRequest),
    /// Page already in hand, no store round-trip needed
    Preloaded(Page),
    Finished,
}

/// Iterator of result pages for one fetch.
///
/// Yields `Err` at most once; after an error the iterator is finished.
pub struct Pages {
    client: Arc<dyn StoreClient>,
    metrics: Arc<MetricsRegistry>,
    state: PagerState,
    policy: PagePolicy,
    table: String,
    operation: &'static str,
    /// Correlates this fetch's page and completion log lines
    fetch_id: String,
    pages_yielded: usize,
    items_total: usize,
    scanned_total: usize,
    last_key_seen: Option<Item>,
    query_info: Option<(Arc<QueryInfoRegistry>, String)>,
}

impl Pages {
    fn with_state(
        client: Arc<dyn StoreClient>,
        metrics: Arc<MetricsRegistry>,
        state: PagerState,
        policy: PagePolicy,
        table: String,
        operation: &'static str,
    ) -> Self {
        Pages {
            client,
            metrics,
            state,
            policy,
            table,
            operation,
            fetch_id: Uuid::new_v4().to_string(),
            pages_yielded: 0,
            items_total: 0,
            scanned_total: 0,
            last_key_seen: None,
            query_info: None,
        }
    }

    /// One point read; yields exactly one page of zero or one items.
    pub(crate) fn single(
        client: Arc<dyn StoreClient>,
        metrics: Arc<MetricsRegistry>,
        request: StoreRequest,
    ) -> Self {
        let table = request.table().unwrap_or("").to_string();
        let operation = request.operation_name();
        Pages::with_state(
            client,
            metrics,
            PagerState::Point(request),
            PagePolicy {
                recursive: false,
                page_limit: None,
            },
            table,
            operation,
        )
    }

    /// A chunked batch read; yields one page per round until every key
    /// is processed.
    pub(crate) fn batched(
        client: Arc<dyn StoreClient>,
        metrics: Arc<MetricsRegistry>,
        request: BatchGetRequest,
        retry_ceiling: u32,
    ) -> Self {
        let table = request.table.clone();
        Pages::with_state(
            client,
            metrics,
            PagerState::Batch(BatchFetch::new(request, retry_ceiling)),
            PagePolicy {
                recursive: true,
                page_limit: None,
            },
            table,
            "batch_get",
        )
    }

    /// A cursored query or scan following resume cursors per `policy`.
    pub(crate) fn cursored(
        client: Arc<dyn StoreClient>,
        metrics: Arc<MetricsRegistry>,
        request: CursorRequest,
        policy: PagePolicy,
    ) -> Self {
        let table = request.table().to_string();
        let operation = request.operation_name();
        Pages::with_state(
            client,
            metrics,
            PagerState::Cursor(request),
            policy,
            table,
            operation,
        )
    }

    /// A page served from the scan cache; yields it once without any
    /// store round-trip.
    pub(crate) fn preloaded(
        client: Arc<dyn StoreClient>,
        metrics: Arc<MetricsRegistry>,
        page: Page,
        table: String,
    ) -> Self {
        Pages::with_state(
            client,
            metrics,
            PagerState::Preloaded(page),
            PagePolicy {
                recursive: false,
                page_limit: None,
            },
            table,
            "scan",
        )
    }

    /// Records completion bookkeeping under `key` when iteration runs to
    /// the end.
    pub(crate) fn with_query_info(mut self, registry: Arc<QueryInfoRegistry>, key: String) -> Self {
        self.query_info = Some((registry, key));
        self
    }

    /// Drains every page and returns the items in arrival order.
    pub fn collect_items(self) -> EngineResult<Vec<Item>> {
        let mut items = Vec::new();
        for page in self {
            items.append(&mut page?.items);
        }
        Ok(items)
    }

    /// Per-page bookkeeping. Pages that came from a store round-trip
    /// count toward fetch metrics; cached pages do not.
    fn record_page(&mut self, page: &Page, from_store: bool) {
        self.pages_yielded += 1;
        self.items_total += page.count;
        self.scanned_total += page.scanned_count;
        self.last_key_seen = page.last_key.clone();
        if from_store {
            self.metrics.increment_pages_fetched();
            self.metrics.add_items_fetched(page.count as u64);
            log_event_with_fields(
                Event::PageFetched,
                &[
                    ("table", &self.table),
                    ("operation", self.operation),
                    ("fetch_id", &self.fetch_id),
                    ("page", &self.pages_yielded.to_string()),
                    ("items", &page.count.to_string()),
                    ("has_more", if page.has_more() { "true" } else { "false" }),
                ],
            );
        }
    }

    /// Normal end of iteration. Errors skip this, leaving no completion
    /// log and no recorded query info.
    fn complete(&mut self) {
        log_event_with_fields(
            Event::FetchComplete,
            &[
                ("table", &self.table),
                ("operation", self.operation),
                ("fetch_id", &self.fetch_id),
                ("pages", &self.pages_yielded.to_string()),
                ("items", &self.items_total.to_string()),
            ],
        );
        if let Some((registry, key)) = self.query_info.take() {
            registry.record(
                &key,
                QueryInfo {
                    count: self.items_total,
                    scanned_count: self.scanned_total,
                    last_key: self.last_key_seen.clone(),
                    pages: self.pages_yielded,
                },
            );
        }
    }

    fn send_expecting_page(&self, request: StoreRequest) -> EngineResult<Page> {
        match send_checked(self.client.as_ref(), request)? {
            StoreResponse::Page(page) => Ok(page),
            other => Err(EngineError::UnexpectedResponse {
                operation: self.operation,
                kind: other.kind(),
            }),
        }
    }

    fn send_expecting_item(&self, request: StoreRequest) -> EngineResult<Page> {
        match send_checked(self.client.as_ref(), request)? {
            StoreResponse::Item(found) => Ok(Page::of(found.into_iter().collect())),
            other => Err(EngineError::UnexpectedResponse {
                operation: self.operation,
                kind: other.kind(),
            }),
        }
    }
}

impl Iterator for Pages {
    type Item = EngineResult<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        // Taking the state up front leaves `Finished` behind, which is
        // exactly right for every error path.
        match std::mem::replace(&mut self.state, PagerState::Finished) {
            PagerState::Finished => None,
            PagerState::Point(request) => match self.send_expecting_item(request) {
                Ok(page) => {
                    self.record_page(&page, true);
                    self.complete();
                    Some(Ok(page))
                }
                Err(error) => Some(Err(error)),
            },
            PagerState::Batch(mut fetch) => {
                match fetch.next_round(self.client.as_ref(), &self.metrics) {
                    Ok(page) => {
                        self.record_page(&page, true);
                        if fetch.is_done() {
                            self.complete();
                        } else {
                            self.state = PagerState::Batch(fetch);
                        }
                        Some(Ok(page))
                    }
                    Err(error) => Some(Err(error)),
                }
            }
            PagerState::Cursor(mut request) => match self
                .send_expecting_page(request.to_store_request())
            {
                Ok(page) => {
                    self.record_page(&page, true);
                    if self.policy.allows(self.pages_yielded, page.has_more()) {
                        request.set_cursor(page.last_key.clone());
                        self.state = PagerState::Cursor(request);
                    } else {
                        self.complete();
                    }
                    Some(Ok(page))
                }
                Err(error) => Some(Err(error)),
            },
            PagerState::Preloaded(page) => {
                self.record_page(&page, false);
                self.complete();
                Some(Ok(page))
            }
        }
    }
}
