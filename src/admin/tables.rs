//! Schema administration with activation polling.
//!
//! Create and update are asynchronous at the store: the call returns
//! while the table or index build runs. Both are polled to completion on
//! the same backoff schedule the retry path uses, so callers get back a
//! table that can serve requests. Deletion is fire-and-forget.

use std::sync::Arc;

use crate::backoff::{BackoffConfig, BackoffState, Sleeper, Step};
use crate::observability::{log_event_with_fields, Event};
use crate::store::{
    StoreClient, StoreRequest, StoreResponse, TableChanges, TableDefinition, TableDescription,
};

use super::errors::{AdminError, AdminResult};

/// Administrative surface over one store client.
pub struct TableAdmin {
    client: Arc<dyn StoreClient>,
    backoff: BackoffConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl TableAdmin {
    pub fn new(
        client: Arc<dyn StoreClient>,
        backoff: BackoffConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        TableAdmin {
            client,
            backoff,
            sleeper,
        }
    }

    /// Creates a table and polls until it and all its indexes are active.
    pub fn create_table(&self, definition: TableDefinition) -> AdminResult<TableDescription> {
        let table = definition.table_name.clone();
        log_event_with_fields(Event::TableCreateBegin, &[("table", &table)]);
        let description =
            self.send_table_call(StoreRequest::CreateTable(definition), "create_table")?;
        self.settle(&table, description)
    }

    /// Applies index changes and polls until the table settles.
    ///
    /// A poll that times out does not undo the submitted change; the
    /// store keeps building it.
    pub fn update_table(
        &self,
        table: &str,
        changes: TableChanges,
    ) -> AdminResult<TableDescription> {
        log_event_with_fields(Event::TableUpdateBegin, &[("table", table)]);
        let description = self.send_table_call(
            StoreRequest::UpdateTable(table.to_string(), changes),
            "update_table",
        )?;
        self.settle(table, description)
    }

    /// Issues a table deletion without waiting for it to finish.
    pub fn delete_table(&self, table: &str) -> AdminResult<TableDescription> {
        log_event_with_fields(Event::TableDeleteBegin, &[("table", table)]);
        self.send_table_call(StoreRequest::DeleteTable(table.to_string()), "delete_table")
    }

    /// Names of every table at the store endpoint.
    pub fn list_tables(&self) -> AdminResult<Vec<String>> {
        match self.client.send(StoreRequest::ListTables)? {
            StoreResponse::TableNames(names) => Ok(names),
            other => Err(AdminError::UnexpectedResponse {
                operation: "list_tables",
                kind: other.kind(),
            }),
        }
    }

    fn send_table_call(
        &self,
        request: StoreRequest,
        operation: &'static str,
    ) -> AdminResult<TableDescription> {
        match self.client.send(request)? {
            StoreResponse::Table(description) => Ok(description),
            other => Err(AdminError::UnexpectedResponse {
                operation,
                kind: other.kind(),
            }),
        }
    }

    fn settle(&self, table: &str, description: TableDescription) -> AdminResult<TableDescription> {
        if description.all_active() {
            log_event_with_fields(Event::TableActive, &[("table", table), ("waited_ms", "0")]);
            return Ok(description);
        }
        self.wait_until_active(table)
    }

    /// Polls describe-table on the backoff schedule until the table and
    /// every index are active, or the wait ceiling passes.
    fn wait_until_active(&self, table: &str) -> AdminResult<TableDescription> {
        let mut state = BackoffState::new(&self.backoff);
        loop {
            let description = self.send_table_call(
                StoreRequest::DescribeTable(table.to_string()),
                "describe_table",
            )?;
            if description.all_active() {
                log_event_with_fields(
                    Event::TableActive,
                    &[
                        ("table", table),
                        ("waited_ms", &state.total_waited_ms().to_string()),
                    ],
                );
                return Ok(description);
            }
            match state.step(&self.backoff) {
                Step::Wait { state: next, wait } => {
                    log_event_with_fields(
                        Event::TablePollWait,
                        &[
                            ("table", table),
                            ("status", description.status.as_str()),
                            ("wait_ms", &wait.as_millis().to_string()),
                        ],
                    );
                    self.sleeper.sleep(wait);
                    state = next;
                }
                Step::Exceeded => {
                    let waited_ms = state.total_waited_ms();
                    log_event_with_fields(
                        Event::TableActivationFailed,
                        &[("table", table), ("waited_ms", &waited_ms.to_string())],
                    );
                    return Err(AdminError::ActivationTimeout {
                        table: table.to_string(),
                        waited_ms,
                    });
                }
            }
        }
    }
}
