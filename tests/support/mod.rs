//! In-memory store double shared by the integration tests.
//!
//! `MemoryStore` implements the store client over sorted in-memory
//! partitions and evaluates the clause text the adapter compiles: key
//! conditions, filters, conditional writes, update sections, and
//! projections. Tests drive a real engine against it and assert on
//! returned items, post-state, and recorded request traffic. Failure
//! injection covers throttling and unprocessed batch keys; a page-size
//! cap forces cursor paging without oversized fixtures.

// Each test binary compiles its own copy of this module and exercises a
// subset of it.
#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value as JsonValue;

use keyplan::backoff::Sleeper;
use keyplan::config::Config;
use keyplan::engine::Engine;
use keyplan::store::{
    item, AttributeDefinition, AttributeValue, BatchGetRequest, BatchPayload, DeleteItemRequest,
    Item, KeyAttributeType, KeySchema, NamePlaceholders, Page, PointGetRequest, ProjectionKind,
    PutItemRequest, QueryRequest, ScanRequest, SecondaryIndexDefinition,
    SecondaryIndexDescription, StoreClient, StoreError, StoreRequest, StoreResponse, StoreResult,
    TableChanges, TableDefinition, TableDescription, TableStatus, UpdateItemRequest,
    ValuePlaceholders,
};

// =============================================================================
// Sleepers
// =============================================================================

/// Sleeper that returns immediately, for tests that ignore retry timing.
pub struct NoopSleeper;

impl Sleeper for NoopSleeper {
    fn sleep(&self, _duration: Duration) {}
}

/// Sleeper that records requested waits instead of blocking.
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingSleeper {
            waits: Mutex::new(Vec::new()),
        })
    }

    /// Waits requested so far, in order.
    pub fn recorded(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

// =============================================================================
// Engine construction
// =============================================================================

/// Engine over `store` with default configuration and no real sleeping.
pub fn engine(store: &Arc<MemoryStore>) -> Engine {
    engine_with(store, Config::default())
}

/// Engine over `store` with the given configuration and no real sleeping.
pub fn engine_with(store: &Arc<MemoryStore>, config: Config) -> Engine {
    Engine::with_sleeper(
        Arc::clone(store) as Arc<dyn StoreClient>,
        config,
        Arc::new(NoopSleeper),
    )
}

/// Engine over `store` with an injected sleeper, for retry-timing tests.
pub fn engine_with_sleeper(
    store: &Arc<MemoryStore>,
    config: Config,
    sleeper: Arc<dyn Sleeper>,
) -> Engine {
    Engine::with_sleeper(Arc::clone(store) as Arc<dyn StoreClient>, config, sleeper)
}

/// Configuration approving scan fallback on the named tables.
pub fn scannable_config(tables: &[&str]) -> Config {
    Config {
        scannable_tables: tables.iter().map(|table| table.to_string()).collect(),
        ..Config::default()
    }
}

/// Configuration approving and caching full scans of one table.
pub fn cached_config(table: &str) -> Config {
    Config {
        scannable_tables: vec![table.to_string()],
        cached_tables: vec![table.to_string()],
        ..Config::default()
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Hash-keyed table with a hash-only secondary index on `email`.
pub fn person_table() -> TableDefinition {
    TableDefinition {
        table_name: "person".to_string(),
        attribute_definitions: vec![
            AttributeDefinition::new("id", KeyAttributeType::S),
            AttributeDefinition::new("email", KeyAttributeType::S),
        ],
        key_schema: KeySchema::hash("id"),
        secondary_indexes: vec![SecondaryIndexDefinition {
            name: "email".to_string(),
            key_schema: KeySchema::hash("email"),
            projection: ProjectionKind::All,
        }],
        provisioned_throughput: None,
    }
}

/// Composite-keyed table: string hash `book_id`, numeric range `page_num`.
pub fn book_page_table() -> TableDefinition {
    TableDefinition {
        table_name: "book_page".to_string(),
        attribute_definitions: vec![
            AttributeDefinition::new("book_id", KeyAttributeType::S),
            AttributeDefinition::new("page_num", KeyAttributeType::N),
        ],
        key_schema: KeySchema::composite("book_id", "page_num"),
        secondary_indexes: Vec::new(),
        provisioned_throughput: None,
    }
}

/// Composite-keyed table with a string range attribute.
pub fn note_table() -> TableDefinition {
    TableDefinition {
        table_name: "note".to_string(),
        attribute_definitions: vec![
            AttributeDefinition::new("owner", KeyAttributeType::S),
            AttributeDefinition::new("created_at", KeyAttributeType::S),
        ],
        key_schema: KeySchema::composite("owner", "created_at"),
        secondary_indexes: Vec::new(),
        provisioned_throughput: None,
    }
}

pub fn person(id: &str, name: &str, email: &str) -> Item {
    item([
        ("id", AttributeValue::from(id)),
        ("name", AttributeValue::from(name)),
        ("email", AttributeValue::from(email)),
    ])
}

pub fn book_page(book_id: &str, page_num: i64) -> Item {
    item([
        ("book_id", AttributeValue::from(book_id)),
        ("page_num", AttributeValue::from(page_num)),
        ("text", AttributeValue::string(format!("page {}", page_num))),
    ])
}

pub fn note(owner: &str, created_at: &str, body: &str) -> Item {
    item([
        ("owner", AttributeValue::from(owner)),
        ("created_at", AttributeValue::from(created_at)),
        ("body", AttributeValue::from(body)),
    ])
}

/// Builds the `(field, value)` condition list the fetch API accepts.
pub fn conditions(
    pairs: impl IntoIterator<Item = (&'static str, JsonValue)>,
) -> Vec<(String, JsonValue)> {
    pairs
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
}

// =============================================================================
// MemoryStore
// =============================================================================

struct TableData {
    description: TableDescription,
    /// Records sorted by primary key.
    records: Vec<Item>,
}

pub struct MemoryStore {
    tables: Mutex<HashMap<String, TableData>>,
    /// Store-enforced cap on examined items per read, independent of any
    /// request-level limit.
    page_size: Mutex<Option<usize>>,
    /// Outcome overrides for upcoming sends, one slot per request,
    /// consumed before any table dispatch. `None` lets the send proceed.
    failures: Mutex<VecDeque<Option<StoreError>>>,
    /// Per batch round, how many trailing keys to return unprocessed.
    withhold: Mutex<VecDeque<usize>>,
    /// Tables whose creation reports `CREATING` until the given number of
    /// describes have been served.
    pending: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<StoreRequest>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(MemoryStore {
            tables: Mutex::new(HashMap::new()),
            page_size: Mutex::new(None),
            failures: Mutex::new(VecDeque::new()),
            withhold: Mutex::new(VecDeque::new()),
            pending: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Seeds an active table without going through the client path.
    pub fn register(&self, definition: TableDefinition) {
        let description = describe_definition(&definition);
        self.tables.lock().unwrap().insert(
            definition.table_name.clone(),
            TableData {
                description,
                records: Vec::new(),
            },
        );
    }

    /// Inserts or replaces one record directly, bypassing conditions.
    pub fn seed(&self, table: &str, record: Item) {
        let mut tables = self.tables.lock().unwrap();
        let data = tables.get_mut(table).expect("seed targets a registered table");
        let schema = data.description.key_schema.clone();
        let key = record_key(&schema, &record);
        data.records.retain(|existing| !keys_match(&schema, existing, &key));
        data.records.push(record);
        data.records.sort_by(|a, b| key_cmp(&schema, a, b));
    }

    /// Caps examined items per query/scan round-trip.
    pub fn set_page_size(&self, limit: usize) {
        *self.page_size.lock().unwrap() = Some(limit);
    }

    /// Queues errors returned by the next sends, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = StoreError>) {
        self.failures.lock().unwrap().extend(errors.into_iter().map(Some));
    }

    /// Lets `successes` sends proceed, then fails the one after.
    pub fn fail_after(&self, successes: usize, error: StoreError) {
        let mut failures = self.failures.lock().unwrap();
        failures.extend(std::iter::repeat_with(|| None).take(successes));
        failures.push_back(Some(error));
    }

    /// Queues per-round unprocessed-key counts for upcoming batch reads.
    pub fn withhold_from_batches(&self, counts: impl IntoIterator<Item = usize>) {
        self.withhold.lock().unwrap().extend(counts);
    }

    /// Makes the next creation of `table` report `CREATING`, flipping to
    /// `ACTIVE` once `describes` describe calls have been served.
    pub fn delay_activation(&self, table: &str, describes: usize) {
        self.pending.lock().unwrap().insert(table.to_string(), describes);
    }

    /// Current records of `table` in primary-key order.
    pub fn stored(&self, table: &str) -> Vec<Item> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map(|data| data.records.clone())
            .unwrap_or_default()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<StoreRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Operation names of every request received so far, in order.
    pub fn request_names(&self) -> Vec<&'static str> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(StoreRequest::operation_name)
            .collect()
    }

    /// How many requests of one operation kind have been received.
    pub fn sends_of(&self, operation: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.operation_name() == operation)
            .count()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn point_get(&self, request: PointGetRequest) -> StoreResult<StoreResponse> {
        let tables = self.tables.lock().unwrap();
        let data = fetch_table(&tables, &request.table)?;
        let found = data
            .records
            .iter()
            .find(|record| keys_match(&data.description.key_schema, record, &request.key))
            .map(|record| project(record, request.projection.as_deref(), &request.names));
        Ok(StoreResponse::Item(found))
    }

    fn batch_get(&self, request: BatchGetRequest) -> StoreResult<StoreResponse> {
        let withheld = self.withhold.lock().unwrap().pop_front().unwrap_or(0);
        let tables = self.tables.lock().unwrap();
        let data = fetch_table(&tables, &request.table)?;
        let served = request.keys.len().saturating_sub(withheld);
        let items = request.keys[..served]
            .iter()
            .filter_map(|key| {
                data.records
                    .iter()
                    .find(|record| keys_match(&data.description.key_schema, record, key))
            })
            .map(|record| project(record, request.projection.as_deref(), &request.names))
            .collect();
        Ok(StoreResponse::Batch(BatchPayload {
            items,
            unprocessed_keys: request.keys[served..].to_vec(),
        }))
    }

    fn query(&self, request: QueryRequest) -> StoreResult<StoreResponse> {
        let tables = self.tables.lock().unwrap();
        let data = fetch_table(&tables, &request.table)?;
        let index = index_schema(&data.description, request.index.as_deref())?;
        let table_key = &data.description.key_schema;

        // Records missing the index hash attribute are not in the index.
        let mut ordered: Vec<&Item> = data
            .records
            .iter()
            .filter(|record| record.contains_key(&index.hash_attribute))
            .collect();
        ordered.sort_by(|a, b| key_cmp(index, a, b).then_with(|| key_cmp(table_key, a, b)));
        if !request.scan_index_forward {
            ordered.reverse();
        }
        let matches: Vec<&Item> = ordered
            .into_iter()
            .filter(|record| {
                expression_holds(&request.key_condition, record, &request.names, &request.values)
            })
            .collect();

        let cursor_of = |record: &Item| {
            let mut cursor = record_key(table_key, record);
            cursor.append(&mut record_key(index, record));
            cursor
        };
        Ok(StoreResponse::Page(self.page(
            &matches,
            request.exclusive_start_key.as_ref(),
            request.limit,
            request.filter.as_deref(),
            request.projection.as_deref(),
            &request.names,
            &request.values,
            cursor_of,
        )))
    }

    fn scan(&self, request: ScanRequest) -> StoreResult<StoreResponse> {
        let tables = self.tables.lock().unwrap();
        let data = fetch_table(&tables, &request.table)?;
        let table_key = &data.description.key_schema;
        let matches: Vec<&Item> = data.records.iter().collect();
        let cursor_of = |record: &Item| record_key(table_key, record);
        Ok(StoreResponse::Page(self.page(
            &matches,
            request.exclusive_start_key.as_ref(),
            request.limit,
            request.filter.as_deref(),
            request.projection.as_deref(),
            &request.names,
            &request.values,
            cursor_of,
        )))
    }

    /// One read round-trip: resume after the cursor, examine up to the
    /// effective limit, filter, project, and report the next cursor.
    #[allow(clippy::too_many_arguments)]
    fn page(
        &self,
        matches: &[&Item],
        start_after: Option<&Item>,
        limit: Option<u32>,
        filter: Option<&str>,
        projection: Option<&str>,
        names: &NamePlaceholders,
        values: &ValuePlaceholders,
        cursor_of: impl Fn(&Item) -> Item,
    ) -> Page {
        let start = match start_after {
            None => 0,
            Some(cursor) => {
                let position = matches
                    .iter()
                    .position(|record| cursor_of(record) == *cursor)
                    .expect("resume cursor does not match any record");
                position + 1
            }
        };
        let window = match (limit, *self.page_size.lock().unwrap()) {
            (Some(requested), Some(cap)) => Some((requested as usize).min(cap)),
            (Some(requested), None) => Some(requested as usize),
            (None, Some(cap)) => Some(cap),
            (None, None) => None,
        };
        let end = match window {
            Some(size) => (start + size).min(matches.len()),
            None => matches.len(),
        };
        let examined = &matches[start..end];
        let items: Vec<Item> = examined
            .iter()
            .filter(|record| match filter {
                None => true,
                Some(expression) => expression_holds(expression, record, names, values),
            })
            .map(|record| project(record, projection, names))
            .collect();
        let last_key = if end < matches.len() {
            examined.last().map(|record| cursor_of(record))
        } else {
            None
        };
        let count = items.len();
        Page {
            items,
            count,
            scanned_count: examined.len(),
            last_key,
        }
    }

    fn put_item(&self, request: PutItemRequest) -> StoreResult<StoreResponse> {
        let mut tables = self.tables.lock().unwrap();
        let data = fetch_table_mut(&mut tables, &request.table)?;
        let schema = data.description.key_schema.clone();
        for attribute in key_attributes(&schema) {
            if !request.item.contains_key(attribute) {
                return Err(StoreError::Validation(format!(
                    "put on '{}' is missing key attribute '{}'",
                    request.table, attribute
                )));
            }
        }
        let key = record_key(&schema, &request.item);
        let position = data
            .records
            .iter()
            .position(|record| keys_match(&schema, record, &key));
        let current = position.map(|found| &data.records[found]);
        if !condition_holds(request.condition.as_deref(), current, &request.names, &request.values)
        {
            return Err(StoreError::ConditionalCheckFailed {
                table: request.table,
            });
        }
        match position {
            Some(found) => data.records[found] = request.item,
            None => {
                data.records.push(request.item);
                data.records.sort_by(|a, b| key_cmp(&schema, a, b));
            }
        }
        Ok(StoreResponse::Mutated)
    }

    fn update_item(&self, request: UpdateItemRequest) -> StoreResult<StoreResponse> {
        let mut tables = self.tables.lock().unwrap();
        let data = fetch_table_mut(&mut tables, &request.table)?;
        let schema = data.description.key_schema.clone();
        let position = data
            .records
            .iter()
            .position(|record| keys_match(&schema, record, &request.key));
        let current = position.map(|found| &data.records[found]);
        if !condition_holds(request.condition.as_deref(), current, &request.names, &request.values)
        {
            return Err(StoreError::ConditionalCheckFailed {
                table: request.table,
            });
        }
        // The store upserts: an absent key starts from the key attributes.
        let mut record = match position {
            Some(found) => data.records[found].clone(),
            None => request.key.clone(),
        };
        apply_update(&mut record, &request.update, &request.names, &request.values);
        match position {
            Some(found) => data.records[found] = record,
            None => {
                data.records.push(record);
                data.records.sort_by(|a, b| key_cmp(&schema, a, b));
            }
        }
        Ok(StoreResponse::Mutated)
    }

    fn delete_item(&self, request: DeleteItemRequest) -> StoreResult<StoreResponse> {
        let mut tables = self.tables.lock().unwrap();
        let data = fetch_table_mut(&mut tables, &request.table)?;
        let schema = data.description.key_schema.clone();
        data.records
            .retain(|record| !keys_match(&schema, record, &request.key));
        Ok(StoreResponse::Mutated)
    }

    fn describe_table(&self, table: &str) -> StoreResult<StoreResponse> {
        let mut tables = self.tables.lock().unwrap();
        let data = fetch_table_mut(&mut tables, table)?;
        let mut pending = self.pending.lock().unwrap();
        if let Some(remaining) = pending.get_mut(table) {
            if *remaining <= 1 {
                pending.remove(table);
                data.description.status = TableStatus::Active;
            } else {
                *remaining -= 1;
            }
        }
        Ok(StoreResponse::Table(data.description.clone()))
    }

    fn create_table(&self, definition: TableDefinition) -> StoreResult<StoreResponse> {
        let mut tables = self.tables.lock().unwrap();
        if tables.contains_key(&definition.table_name) {
            return Err(StoreError::ResourceInUse(definition.table_name));
        }
        let mut description = describe_definition(&definition);
        if self
            .pending
            .lock()
            .unwrap()
            .contains_key(&definition.table_name)
        {
            description.status = TableStatus::Creating;
        }
        tables.insert(
            definition.table_name.clone(),
            TableData {
                description: description.clone(),
                records: Vec::new(),
            },
        );
        Ok(StoreResponse::Table(description))
    }

    fn update_table(&self, table: &str, changes: TableChanges) -> StoreResult<StoreResponse> {
        let mut tables = self.tables.lock().unwrap();
        let data = fetch_table_mut(&mut tables, table)?;
        data.description
            .secondary_indexes
            .retain(|index| !changes.delete_indexes.contains(&index.name));
        for definition in &changes.attribute_definitions {
            if data.description.attribute_type(&definition.name).is_none() {
                data.description.attribute_definitions.push(definition.clone());
            }
        }
        for index in changes.create_indexes {
            data.description.secondary_indexes.push(SecondaryIndexDescription {
                name: index.name,
                key_schema: index.key_schema,
                projection: index.projection,
                status: TableStatus::Active,
            });
        }
        Ok(StoreResponse::Table(data.description.clone()))
    }

    fn delete_table(&self, table: &str) -> StoreResult<StoreResponse> {
        let mut tables = self.tables.lock().unwrap();
        match tables.remove(table) {
            Some(data) => Ok(StoreResponse::Table(data.description)),
            None => Err(StoreError::ResourceNotFound(format!("table '{}'", table))),
        }
    }

    fn list_tables(&self) -> StoreResult<StoreResponse> {
        let tables = self.tables.lock().unwrap();
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        Ok(StoreResponse::TableNames(names))
    }
}

impl StoreClient for MemoryStore {
    fn send(&self, request: StoreRequest) -> StoreResult<StoreResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(Some(error)) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        match request {
            StoreRequest::PointGet(request) => self.point_get(request),
            StoreRequest::BatchGet(request) => self.batch_get(request),
            StoreRequest::Query(request) => self.query(request),
            StoreRequest::Scan(request) => self.scan(request),
            StoreRequest::PutItem(request) => self.put_item(request),
            StoreRequest::UpdateItem(request) => self.update_item(request),
            StoreRequest::DeleteItem(request) => self.delete_item(request),
            StoreRequest::DescribeTable(table) => self.describe_table(&table),
            StoreRequest::CreateTable(definition) => self.create_table(definition),
            StoreRequest::UpdateTable(table, changes) => self.update_table(&table, changes),
            StoreRequest::DeleteTable(table) => self.delete_table(&table),
            StoreRequest::ListTables => self.list_tables(),
        }
    }
}

// =============================================================================
// Key helpers
// =============================================================================

fn describe_definition(definition: &TableDefinition) -> TableDescription {
    TableDescription {
        table_name: definition.table_name.clone(),
        status: TableStatus::Active,
        attribute_definitions: definition.attribute_definitions.clone(),
        key_schema: definition.key_schema.clone(),
        secondary_indexes: definition
            .secondary_indexes
            .iter()
            .map(|index| SecondaryIndexDescription {
                name: index.name.clone(),
                key_schema: index.key_schema.clone(),
                projection: index.projection.clone(),
                status: TableStatus::Active,
            })
            .collect(),
    }
}

fn fetch_table<'a>(
    tables: &'a HashMap<String, TableData>,
    name: &str,
) -> StoreResult<&'a TableData> {
    tables
        .get(name)
        .ok_or_else(|| StoreError::ResourceNotFound(format!("table '{}'", name)))
}

fn fetch_table_mut<'a>(
    tables: &'a mut HashMap<String, TableData>,
    name: &str,
) -> StoreResult<&'a mut TableData> {
    tables
        .get_mut(name)
        .ok_or_else(|| StoreError::ResourceNotFound(format!("table '{}'", name)))
}

fn index_schema<'a>(
    description: &'a TableDescription,
    index: Option<&str>,
) -> StoreResult<&'a KeySchema> {
    match index {
        None => Ok(&description.key_schema),
        Some(name) => description
            .secondary_indexes
            .iter()
            .find(|candidate| candidate.name == name)
            .map(|candidate| &candidate.key_schema)
            .ok_or_else(|| {
                StoreError::ResourceNotFound(format!(
                    "index '{}' on table '{}'",
                    name, description.table_name
                ))
            }),
    }
}

fn key_attributes(schema: &KeySchema) -> impl Iterator<Item = &String> {
    std::iter::once(&schema.hash_attribute).chain(schema.range_attribute.iter())
}

fn record_key(schema: &KeySchema, record: &Item) -> Item {
    let mut key = Item::new();
    for attribute in key_attributes(schema) {
        if let Some(value) = record.get(attribute) {
            key.insert(attribute.clone(), value.clone());
        }
    }
    key
}

fn keys_match(schema: &KeySchema, record: &Item, key: &Item) -> bool {
    key_attributes(schema).all(|attribute| record.get(attribute) == key.get(attribute))
}

/// Store ordering for key values: strings and bytes sort bytewise,
/// numbers numerically. Cross-type comparisons have no order.
fn value_cmp(a: &AttributeValue, b: &AttributeValue) -> Option<Ordering> {
    match (a, b) {
        (AttributeValue::S(left), AttributeValue::S(right)) => Some(left.cmp(right)),
        (AttributeValue::N(left), AttributeValue::N(right)) => {
            let left = left.parse::<f64>().ok()?;
            let right = right.parse::<f64>().ok()?;
            left.partial_cmp(&right)
        }
        (AttributeValue::B(left), AttributeValue::B(right)) => Some(left.cmp(right)),
        _ => None,
    }
}

fn key_cmp(schema: &KeySchema, a: &Item, b: &Item) -> Ordering {
    for attribute in key_attributes(schema) {
        let ordering = match (a.get(attribute), b.get(attribute)) {
            (Some(left), Some(right)) => value_cmp(left, right).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

// =============================================================================
// Clause evaluation
// =============================================================================

fn attribute(token: &str, names: &NamePlaceholders) -> String {
    names
        .get(token)
        .unwrap_or_else(|| panic!("clause references unmapped name token '{}'", token))
        .clone()
}

fn operand<'a>(token: &str, values: &'a ValuePlaceholders) -> &'a AttributeValue {
    values
        .get(token)
        .unwrap_or_else(|| panic!("clause references unmapped value token '{}'", token))
}

/// Splits a conjunction on top-level `AND`, leaving `BETWEEN x AND y`
/// and parenthesized groups intact.
fn split_and(expression: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let bytes = expression.as_bytes();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_between = false;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'B' if depth == 0 && expression[i..].starts_with("BETWEEN ") => in_between = true,
            b'A' if depth == 0 && i > start && expression[i..].starts_with("AND ") => {
                if in_between {
                    in_between = false;
                } else {
                    clauses.push(expression[start..i].trim());
                    start = i + 4;
                }
            }
            _ => {}
        }
        i += 1;
    }
    clauses.push(expression[start..].trim());
    clauses
}

/// Splits comma-separated operands, respecting parentheses.
fn split_operands(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in body.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(body[start..].trim());
    parts
}

fn call_args<'a>(clause: &'a str, function: &str) -> Option<&'a str> {
    clause
        .strip_prefix(function)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn expression_holds(
    expression: &str,
    record: &Item,
    names: &NamePlaceholders,
    values: &ValuePlaceholders,
) -> bool {
    split_and(expression)
        .iter()
        .all(|clause| clause_holds(clause, record, names, values))
}

fn clause_holds(
    clause: &str,
    record: &Item,
    names: &NamePlaceholders,
    values: &ValuePlaceholders,
) -> bool {
    // Parenthesized disjunction, as compiled from a nil test.
    if let Some(inner) = clause.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        return inner
            .split(" OR ")
            .any(|alternative| clause_holds(alternative.trim(), record, names, values));
    }
    if let Some(argument) = call_args(clause, "attribute_not_exists") {
        return !record.contains_key(&attribute(argument, names));
    }
    if let Some(arguments) = call_args(clause, "begins_with") {
        let (name_token, value_token) = arguments
            .split_once(", ")
            .expect("begins_with takes two arguments");
        let prefix = match operand(value_token, values) {
            AttributeValue::S(prefix) => prefix,
            other => panic!("begins_with prefix must be a string, got {:?}", other),
        };
        return matches!(
            record.get(&attribute(name_token, names)),
            Some(AttributeValue::S(stored)) if stored.starts_with(prefix)
        );
    }
    if let Some((name_token, bounds)) = clause.split_once(" BETWEEN ") {
        let (low_token, high_token) =
            bounds.split_once(" AND ").expect("BETWEEN takes two bounds");
        return match record.get(&attribute(name_token.trim(), names)) {
            Some(value) => matches!(
                (
                    value_cmp(value, operand(low_token, values)),
                    value_cmp(value, operand(high_token, values)),
                ),
                (Some(lower), Some(upper))
                    if lower != Ordering::Less && upper != Ordering::Greater
            ),
            None => false,
        };
    }
    if let Some((name_token, list_text)) = clause.split_once(" IN ") {
        let current = record.get(&attribute(name_token.trim(), names));
        let inner = list_text
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .expect("IN takes a parenthesized operand list");
        return split_operands(inner)
            .iter()
            .any(|token| current == Some(operand(token, values)));
    }
    if let Some((name_token, value_token)) = clause.split_once(" = ") {
        return record.get(&attribute(name_token.trim(), names))
            == Some(operand(value_token.trim(), values));
    }
    panic!("unsupported clause '{}'", clause);
}

/// Evaluates a conditional-write clause against the stored record, or
/// against an empty record when no record exists yet.
fn condition_holds(
    condition: Option<&str>,
    existing: Option<&Item>,
    names: &NamePlaceholders,
    values: &ValuePlaceholders,
) -> bool {
    match condition {
        None => true,
        Some(expression) => {
            let empty = Item::new();
            let record = existing.unwrap_or(&empty);
            expression_holds(expression, record, names, values)
        }
    }
}

fn project(record: &Item, projection: Option<&str>, names: &NamePlaceholders) -> Item {
    match projection {
        None => record.clone(),
        Some(clause) => {
            let mut projected = Item::new();
            for token in split_operands(clause) {
                let field = attribute(token, names);
                if let Some(value) = record.get(&field) {
                    projected.insert(field, value.clone());
                }
            }
            projected
        }
    }
}

// =============================================================================
// Update clause application
// =============================================================================

fn apply_update(
    record: &mut Item,
    clause: &str,
    names: &NamePlaceholders,
    values: &ValuePlaceholders,
) {
    let mut pulls: Vec<(String, usize)> = Vec::new();
    for (keyword, body) in update_sections(clause) {
        for operand_text in split_operands(body) {
            match keyword {
                "SET" => apply_set(record, operand_text, names, values),
                "REMOVE" => match operand_text.split_once('[') {
                    Some((name_token, index_text)) => {
                        let index = index_text
                            .trim_end_matches(']')
                            .parse()
                            .expect("list removal index");
                        pulls.push((attribute(name_token, names), index));
                    }
                    None => {
                        record.remove(&attribute(operand_text, names));
                    }
                },
                "ADD" => apply_add(record, operand_text, names, values),
                "DELETE" => apply_delete(record, operand_text, names, values),
                other => panic!("unknown update section '{}'", other),
            }
        }
    }
    // Indexed removals refer to positions in the original list value, so
    // they apply last, highest index first.
    pulls.sort_by(|a, b| b.1.cmp(&a.1));
    for (field, index) in pulls {
        if let Some(AttributeValue::L(elements)) = record.get_mut(&field) {
            if index < elements.len() {
                elements.remove(index);
            }
        }
    }
}

/// Splits an update clause into its `SET` / `REMOVE` / `ADD` / `DELETE`
/// sections. Keywords never occur inside operand text, which is all
/// placeholder tokens and punctuation.
fn update_sections(clause: &str) -> Vec<(&'static str, &str)> {
    const KEYWORDS: [&str; 4] = ["SET", "REMOVE", "ADD", "DELETE"];
    let mut boundaries: Vec<(usize, &'static str)> = Vec::new();
    for keyword in KEYWORDS {
        if clause.starts_with(&format!("{} ", keyword)) {
            boundaries.push((0, keyword));
        }
        let embedded = format!(" {} ", keyword);
        let mut offset = 0;
        while let Some(found) = clause[offset..].find(&embedded) {
            boundaries.push((offset + found + 1, keyword));
            offset += found + 1;
        }
    }
    boundaries.sort_by_key(|(position, _)| *position);
    boundaries
        .iter()
        .enumerate()
        .map(|(i, (position, keyword))| {
            let body_start = position + keyword.len();
            let body_end = boundaries
                .get(i + 1)
                .map(|(next, _)| *next)
                .unwrap_or(clause.len());
            (*keyword, clause[body_start..body_end].trim())
        })
        .collect()
}

fn apply_set(
    record: &mut Item,
    operand_text: &str,
    names: &NamePlaceholders,
    values: &ValuePlaceholders,
) {
    let (name_token, value_text) = operand_text.split_once(" = ").expect("SET operand shape");
    let field = attribute(name_token, names);
    if let Some(arguments) = call_args(value_text, "list_append") {
        let (prepended_token, _) = arguments
            .split_once(", ")
            .expect("list_append takes two arguments");
        let mut elements = match operand(prepended_token, values).clone() {
            AttributeValue::L(elements) => elements,
            other => vec![other],
        };
        if let Some(AttributeValue::L(mut current)) = record.get(&field).cloned() {
            elements.append(&mut current);
        }
        record.insert(field, AttributeValue::L(elements));
    } else {
        record.insert(field, operand(value_text, values).clone());
    }
}

fn apply_add(
    record: &mut Item,
    operand_text: &str,
    names: &NamePlaceholders,
    values: &ValuePlaceholders,
) {
    let (name_token, value_token) = operand_text.split_once(' ').expect("ADD operand shape");
    let field = attribute(name_token, names);
    let addend = operand(value_token, values).clone();
    let updated = match (record.get(&field), addend) {
        (Some(AttributeValue::N(current)), AttributeValue::N(delta)) => {
            let sum = current.parse::<f64>().expect("numeric attribute")
                + delta.parse::<f64>().expect("numeric operand");
            AttributeValue::N(format_number(sum))
        }
        (None, AttributeValue::N(delta)) => AttributeValue::N(delta),
        (Some(AttributeValue::SS(current)), AttributeValue::SS(additions)) => {
            let mut merged = current.clone();
            for value in additions {
                if !merged.contains(&value) {
                    merged.push(value);
                }
            }
            merged.sort();
            AttributeValue::SS(merged)
        }
        (Some(AttributeValue::NS(current)), AttributeValue::NS(additions)) => {
            let mut merged = current.clone();
            for value in additions {
                if !merged.contains(&value) {
                    merged.push(value);
                }
            }
            merged.sort_by(|a, b| {
                value_cmp(&AttributeValue::N(a.clone()), &AttributeValue::N(b.clone()))
                    .unwrap_or(Ordering::Equal)
            });
            AttributeValue::NS(merged)
        }
        (None, set @ AttributeValue::SS(_)) | (None, set @ AttributeValue::NS(_)) => set,
        (current, addend) => panic!("ADD on incompatible values: {:?} + {:?}", current, addend),
    };
    record.insert(field, updated);
}

fn apply_delete(
    record: &mut Item,
    operand_text: &str,
    names: &NamePlaceholders,
    values: &ValuePlaceholders,
) {
    let (name_token, value_token) = operand_text.split_once(' ').expect("DELETE operand shape");
    let field = attribute(name_token, names);
    let removal = operand(value_token, values).clone();
    let remaining = match (record.get(&field), removal) {
        (Some(AttributeValue::SS(current)), AttributeValue::SS(removals)) => AttributeValue::SS(
            current
                .iter()
                .filter(|value| !removals.contains(value))
                .cloned()
                .collect(),
        ),
        (Some(AttributeValue::NS(current)), AttributeValue::NS(removals)) => AttributeValue::NS(
            current
                .iter()
                .filter(|value| !removals.contains(value))
                .cloned()
                .collect(),
        ),
        (None, _) => return,
        (current, removal) => {
            panic!("DELETE on incompatible values: {:?} - {:?}", current, removal)
        }
    };
    // The store drops a set attribute that loses its last element.
    let empty = matches!(
        &remaining,
        AttributeValue::SS(values) if values.is_empty()
    ) || matches!(
        &remaining,
        AttributeValue::NS(values) if values.is_empty()
    );
    if empty {
        record.remove(&field);
    } else {
        record.insert(field, remaining);
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
