//! Typed store responses
//!
//! One success payload shape per operation family. The engine matches on
//! the variant it expects; a mismatched variant is a store-client contract
//! violation, not a user error.

use serde::{Deserialize, Serialize};

use super::table::TableDescription;
use super::value::Item;

/// One store round-trip's worth of read results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Returned items, in store order
    pub items: Vec<Item>,
    /// Number of items returned after filtering
    pub count: usize,
    /// Number of items the store examined before filtering
    pub scanned_count: usize,
    /// Opaque resume cursor; `None` means no further pages exist
    pub last_key: Option<Item>,
}

impl Page {
    /// Builds a page from items, with count bookkeeping filled in
    pub fn of(items: Vec<Item>) -> Self {
        let count = items.len();
        Self {
            items,
            count,
            scanned_count: count,
            last_key: None,
        }
    }

    /// Returns true when the store reports more results beyond this page
    pub fn has_more(&self) -> bool {
        self.last_key.is_some()
    }
}

/// Batch-get payload: delivered items plus the keys the store declined
/// to process in this round-trip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchPayload {
    /// Items delivered in this call
    pub items: Vec<Item>,
    /// Keys the caller must resubmit
    pub unprocessed_keys: Vec<Item>,
}

/// Typed success payload for every store operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreResponse {
    /// PointGet result
    Item(Option<Item>),
    /// BatchGet result
    Batch(BatchPayload),
    /// Query/Scan result
    Page(Page),
    /// PutItem/UpdateItem/DeleteItem acknowledgement
    Mutated,
    /// DescribeTable/CreateTable/UpdateTable/DeleteTable result
    Table(TableDescription),
    /// ListTables result
    TableNames(Vec<String>),
}

impl StoreResponse {
    /// Returns the payload kind name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            StoreResponse::Item(_) => "item",
            StoreResponse::Batch(_) => "batch",
            StoreResponse::Page(_) => "page",
            StoreResponse::Mutated => "mutated",
            StoreResponse::Table(_) => "table",
            StoreResponse::TableNames(_) => "table_names",
        }
    }
}
