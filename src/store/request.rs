//! Store operation descriptors
//!
//! One variant per store operation. Key-condition, filter, condition and
//! update clauses are carried as compiled expression text plus the
//! request-level `#name` / `:value` placeholder maps they reference; the
//! wire client serializes these verbatim.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::table::{TableChanges, TableDefinition};
use super::value::{AttributeValue, Item};

/// Placeholder map from `#name` tokens to real attribute names
pub type NamePlaceholders = BTreeMap<String, String>;

/// Placeholder map from `:value` tokens to attribute values
pub type ValuePlaceholders = BTreeMap<String, AttributeValue>;

/// A single-item read by full primary key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGetRequest {
    /// Table name
    pub table: String,
    /// Full primary key of the requested item
    pub key: Item,
    /// Strongly consistent read
    pub consistent_read: bool,
    /// Optional projection expression
    pub projection: Option<String>,
    /// Name placeholders referenced by the projection
    pub names: NamePlaceholders,
}

/// A grouped read of up to the store's batch ceiling of primary keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchGetRequest {
    /// Table name
    pub table: String,
    /// Full primary keys, in caller order
    pub keys: Vec<Item>,
    /// Strongly consistent read
    pub consistent_read: bool,
    /// Optional projection expression
    pub projection: Option<String>,
    /// Name placeholders referenced by the projection
    pub names: NamePlaceholders,
}

/// An indexed read against the table or a named secondary index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Table name
    pub table: String,
    /// Secondary index to read; `None` reads the table's own key
    pub index: Option<String>,
    /// Key-condition clause (always present for a query)
    pub key_condition: String,
    /// Post-read filter clause
    pub filter: Option<String>,
    /// Optional projection expression
    pub projection: Option<String>,
    /// Name placeholders shared by all clauses
    pub names: NamePlaceholders,
    /// Value placeholders shared by all clauses
    pub values: ValuePlaceholders,
    /// Ascending (`true`) or descending sort-key order
    pub scan_index_forward: bool,
    /// Strongly consistent read
    pub consistent_read: bool,
    /// Resume cursor from a previous page
    pub exclusive_start_key: Option<Item>,
    /// Store-side per-page result cap
    pub limit: Option<u32>,
}

/// A full-table read with post-hoc filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Table name
    pub table: String,
    /// Post-read filter clause
    pub filter: Option<String>,
    /// Optional projection expression
    pub projection: Option<String>,
    /// Name placeholders shared by all clauses
    pub names: NamePlaceholders,
    /// Value placeholders shared by all clauses
    pub values: ValuePlaceholders,
    /// Resume cursor from a previous page
    pub exclusive_start_key: Option<Item>,
    /// Store-side per-page result cap
    pub limit: Option<u32>,
}

/// A single-item write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutItemRequest {
    /// Table name
    pub table: String,
    /// Full item to write
    pub item: Item,
    /// Conditional-write clause; the write fails with
    /// `ConditionalCheckFailed` when it evaluates false
    pub condition: Option<String>,
    /// Name placeholders referenced by the condition
    pub names: NamePlaceholders,
    /// Value placeholders referenced by the condition
    pub values: ValuePlaceholders,
}

/// A single-item in-place update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateItemRequest {
    /// Table name
    pub table: String,
    /// Full primary key of the item to update
    pub key: Item,
    /// Update clause (SET / REMOVE / ADD / DELETE sections)
    pub update: String,
    /// Conditional-write clause
    pub condition: Option<String>,
    /// Name placeholders shared by all clauses
    pub names: NamePlaceholders,
    /// Value placeholders shared by all clauses
    pub values: ValuePlaceholders,
}

/// A single-item delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteItemRequest {
    /// Table name
    pub table: String,
    /// Full primary key of the item to delete
    pub key: Item,
    /// Conditional-write clause
    pub condition: Option<String>,
    /// Name placeholders referenced by the condition
    pub names: NamePlaceholders,
    /// Value placeholders referenced by the condition
    pub values: ValuePlaceholders,
}

/// Every operation the core issues against the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreRequest {
    /// Single-item read by full primary key
    PointGet(PointGetRequest),
    /// Grouped multi-key read
    BatchGet(BatchGetRequest),
    /// Indexed read
    Query(QueryRequest),
    /// Full-table read
    Scan(ScanRequest),
    /// Single-item write
    PutItem(PutItemRequest),
    /// Single-item update
    UpdateItem(UpdateItemRequest),
    /// Single-item delete
    DeleteItem(DeleteItemRequest),
    /// Table metadata read
    DescribeTable(String),
    /// Table creation
    CreateTable(TableDefinition),
    /// Index/capacity changes on an existing table
    UpdateTable(String, TableChanges),
    /// Table deletion
    DeleteTable(String),
    /// Table name listing
    ListTables,
}

impl StoreRequest {
    /// Returns the operation name used in log fields
    pub fn operation_name(&self) -> &'static str {
        match self {
            StoreRequest::PointGet(_) => "point_get",
            StoreRequest::BatchGet(_) => "batch_get",
            StoreRequest::Query(_) => "query",
            StoreRequest::Scan(_) => "scan",
            StoreRequest::PutItem(_) => "put_item",
            StoreRequest::UpdateItem(_) => "update_item",
            StoreRequest::DeleteItem(_) => "delete_item",
            StoreRequest::DescribeTable(_) => "describe_table",
            StoreRequest::CreateTable(_) => "create_table",
            StoreRequest::UpdateTable(_, _) => "update_table",
            StoreRequest::DeleteTable(_) => "delete_table",
            StoreRequest::ListTables => "list_tables",
        }
    }

    /// Returns the table this request addresses, when it addresses one
    pub fn table(&self) -> Option<&str> {
        match self {
            StoreRequest::PointGet(r) => Some(&r.table),
            StoreRequest::BatchGet(r) => Some(&r.table),
            StoreRequest::Query(r) => Some(&r.table),
            StoreRequest::Scan(r) => Some(&r.table),
            StoreRequest::PutItem(r) => Some(&r.table),
            StoreRequest::UpdateItem(r) => Some(&r.table),
            StoreRequest::DeleteItem(r) => Some(&r.table),
            StoreRequest::DescribeTable(t)
            | StoreRequest::UpdateTable(t, _)
            | StoreRequest::DeleteTable(t) => Some(t),
            StoreRequest::CreateTable(def) => Some(&def.table_name),
            StoreRequest::ListTables => None,
        }
    }
}
