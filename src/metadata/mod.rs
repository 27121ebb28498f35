//! Table metadata: resolved key structure, cached per table
//!
//! The store's table descriptions are flattened into one descriptor per
//! access path and cached until a schema change invalidates them. The
//! planner consumes this view; it never sees raw descriptions.

mod cache;
mod errors;
mod types;

pub use cache::MetadataCache;
pub use errors::{MetadataError, MetadataResult};
pub use types::{IndexDescriptor, TableMetadata};
