//! Per-call options for reads and writes.

use serde::{Deserialize, Serialize};

use crate::store::{AttributeValue, Item};

/// What to do when an insert collides with an existing primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnConflict {
    /// Fail the insert with the store's conditional-check error.
    #[default]
    Raise,
    /// Swallow the collision; the caller gets back the attempted key and
    /// no error.
    Nothing,
    /// Overwrite the existing record unconditionally.
    Replace,
}

/// Options accepted by the fetch path.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    /// Permit a fallback scan for this call even when the table is not
    /// approved for scanning in configuration.
    pub scan: bool,
    /// Store-side per-page result cap for query and scan.
    pub scan_limit: Option<u32>,
    /// Overrides the operation's default paging behavior. `None` keeps
    /// the default: recursive for keyed reads, single-page for scans.
    pub recursive: Option<bool>,
    /// Stop after this many pages. Takes precedence over `recursive`.
    pub page_limit: Option<usize>,
    /// Resume cursor from a previous page.
    pub exclusive_start_key: Option<Item>,
    /// Sort-key order for queries: ascending when true.
    pub scan_index_forward: bool,
    /// Strongly consistent reads.
    pub consistent_read: bool,
    /// When set, the engine records per-fetch metadata (count, scanned
    /// count, last cursor) retrievable once under this key.
    pub query_info_key: Option<String>,
}

impl Default for CallOptions {
    fn default() -> Self {
        CallOptions {
            scan: false,
            scan_limit: None,
            recursive: None,
            page_limit: None,
            exclusive_start_key: None,
            scan_index_forward: true,
            consistent_read: false,
            query_info_key: None,
        }
    }
}

/// Attribute projection for the fetch path. The mutate path projects key
/// attributes only; everything else reads full items.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Projection {
    #[default]
    Full,
    Attributes(Vec<String>),
}

/// Options accepted by the single-item write path.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    pub on_conflict: OnConflict,
    /// Encode nil fields as the explicit null marker on insert; when
    /// false they are omitted from the stored item. Defaults to true,
    /// which keeps inserted nils visible to `is_nil` filters.
    pub insert_nil_fields: bool,
    /// Compile nil'd fields to REMOVE clauses on update; when false they
    /// are set to the explicit null marker.
    pub remove_nil_fields: bool,
    /// Explicit sort-key value for update/delete on composite tables
    /// when it cannot be derived from the supplied record.
    pub range_key: Option<AttributeValue>,
    /// Set/list mutation directives compiled into the update clause.
    pub update: UpdateDirectives,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            on_conflict: OnConflict::default(),
            insert_nil_fields: true,
            remove_nil_fields: false,
            range_key: None,
            update: UpdateDirectives::default(),
        }
    }
}

/// Non-assignment update directives.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateDirectives {
    /// ADD operands: numeric increments or set unions, per attribute.
    pub add: Vec<(String, AttributeValue)>,
    /// DELETE operands: set elements to drop, per attribute.
    pub delete: Vec<(String, AttributeValue)>,
    /// List element positions to remove, per attribute.
    pub pull_indexes: Vec<(String, Vec<usize>)>,
    /// Changed fields whose new value is prepended to the stored list
    /// instead of replacing it.
    pub prepend_to_list: Vec<String>,
}

impl UpdateDirectives {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty()
            && self.delete.is_empty()
            && self.pull_indexes.is_empty()
            && self.prepend_to_list.is_empty()
    }

    pub fn prepends(&self, field: &str) -> bool {
        self.prepend_to_list.iter().any(|f| f == field)
    }
}
