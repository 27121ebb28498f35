//! Store client decorator that retries the throttled error class.

use std::sync::Arc;
use std::time::Duration;

use crate::backoff::{run_with_backoff, BackoffConfig, RetryError, Sleeper};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::{StoreClient, StoreError, StoreRequest, StoreResponse, StoreResult};

/// Runs every request through one bounded backoff sequence.
///
/// Retryable errors (throttling, capacity) sleep and resend; anything
/// else surfaces immediately. A retryable error that survives the wait
/// ceiling is returned unchanged, so a retryable kind coming out of this
/// client always means the schedule was exhausted.
pub struct RetryingClient {
    inner: Arc<dyn StoreClient>,
    config: BackoffConfig,
    sleeper: Arc<dyn Sleeper>,
    metrics: Arc<MetricsRegistry>,
}

impl RetryingClient {
    pub fn new(
        inner: Arc<dyn StoreClient>,
        config: BackoffConfig,
        sleeper: Arc<dyn Sleeper>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        RetryingClient {
            inner,
            config,
            sleeper,
            metrics,
        }
    }
}

impl StoreClient for RetryingClient {
    fn send(&self, request: StoreRequest) -> StoreResult<StoreResponse> {
        let operation = request.operation_name();
        let table = request.table().unwrap_or("").to_string();
        let observed = ObservedSleeper {
            inner: self.sleeper.as_ref(),
            metrics: self.metrics.as_ref(),
            operation,
            table: &table,
        };

        let result = run_with_backoff(
            &self.config,
            &observed,
            |error: &StoreError| error.is_retryable(),
            || {
                self.metrics.increment_requests_sent();
                self.inner.send(request.clone())
            },
        );
        match result {
            Ok(response) => Ok(response),
            Err(RetryError::Aborted(error)) => Err(error),
            Err(RetryError::Exhausted(error)) => {
                self.metrics.increment_retries_exhausted();
                log_event_with_fields(
                    Event::RetryExhausted,
                    &[
                        ("error", error.kind()),
                        ("operation", operation),
                        ("table", &table),
                    ],
                );
                Err(error)
            }
        }
    }
}

/// Logs and counts each throttle wait before delegating the sleep.
struct ObservedSleeper<'a> {
    inner: &'a dyn Sleeper,
    metrics: &'a MetricsRegistry,
    operation: &'static str,
    table: &'a str,
}

impl Sleeper for ObservedSleeper<'_> {
    fn sleep(&self, duration: Duration) {
        self.metrics.increment_throttle_retries();
        log_event_with_fields(
            Event::ThrottleWait,
            &[
                ("operation", self.operation),
                ("table", self.table),
                ("wait_ms", &duration.as_millis().to_string()),
            ],
        );
        self.inner.sleep(duration);
    }
}
