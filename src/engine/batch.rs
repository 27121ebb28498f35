//! Chunked batch reads with unprocessed-key resubmission.
//!
//! The store caps one batch read at [`MAX_BATCH_KEYS`] keys and may
//! return any subset of a round as unprocessed. Declined keys go back to
//! the front of the queue, keeping delivery close to caller key order. A
//! bounded resubmission counter turns a store that keeps declining into a
//! hard error instead of an unbounded loop.

use std::collections::VecDeque;

use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::{BatchGetRequest, Item, Page, StoreClient, StoreRequest, StoreResponse};

use super::errors::{EngineError, EngineResult};
use super::send_checked;

/// Most primary keys one batch round may carry
pub(crate) const MAX_BATCH_KEYS: usize = 100;

/// Drains a batch-get key list round by round.
pub(crate) struct BatchFetch {
    /// Request shape reused for every round; its key list is replaced
    template: BatchGetRequest,
    remaining: VecDeque<Item>,
    /// Rounds that came back with unprocessed keys; never reset
    resubmissions: u32,
    retry_ceiling: u32,
}

impl BatchFetch {
    pub(crate) fn new(request: BatchGetRequest, retry_ceiling: u32) -> Self {
        let mut template = request;
        let remaining: VecDeque<Item> = std::mem::take(&mut template.keys).into();
        BatchFetch {
            template,
            remaining,
            resubmissions: 0,
            retry_ceiling,
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Sends one round of up to [`MAX_BATCH_KEYS`] keys and returns the
    /// delivered items as a page.
    pub(crate) fn next_round(
        &mut self,
        client: &dyn StoreClient,
        metrics: &MetricsRegistry,
    ) -> EngineResult<Page> {
        let take = self.remaining.len().min(MAX_BATCH_KEYS);
        let mut request = self.template.clone();
        request.keys = self.remaining.drain(..take).collect();
        let sent = request.keys.len();

        let payload = match send_checked(client, StoreRequest::BatchGet(request))? {
            StoreResponse::Batch(payload) => payload,
            other => {
                return Err(EngineError::UnexpectedResponse {
                    operation: "batch_get",
                    kind: other.kind(),
                })
            }
        };
        metrics.increment_batch_rounds();
        log_event_with_fields(
            Event::BatchGetRound,
            &[
                ("table", &self.template.table),
                ("keys", &sent.to_string()),
                ("returned", &payload.items.len().to_string()),
                ("unprocessed", &payload.unprocessed_keys.len().to_string()),
            ],
        );

        if !payload.unprocessed_keys.is_empty() {
            self.resubmissions += 1;
            metrics.increment_unprocessed_resubmissions();
            if self.resubmissions > self.retry_ceiling {
                let remaining = payload.unprocessed_keys.len() + self.remaining.len();
                log_event_with_fields(
                    Event::BatchRetryExceeded,
                    &[
                        ("table", &self.template.table),
                        ("remaining", &remaining.to_string()),
                        ("rounds", &self.resubmissions.to_string()),
                    ],
                );
                return Err(EngineError::BatchRetriesExhausted {
                    table: self.template.table.clone(),
                    remaining,
                    rounds: self.resubmissions,
                });
            }
            for key in payload.unprocessed_keys.into_iter().rev() {
                self.remaining.push_front(key);
            }
        }

        Ok(Page::of(payload.items))
    }
}
