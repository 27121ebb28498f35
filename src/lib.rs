//! keyplan - Index-aware query planning and execution for a partitioned
//! key-value store
//!
//! Maps relational-style predicate lists onto a store that only reads
//! efficiently by declared keys: selects the index (or scan) serving a
//! fetch, compiles the request, pages through results, retries the
//! throttled error class on a bounded backoff schedule, and emulates
//! multi-record mutation as fetch-then-write.

pub mod admin;
pub mod backoff;
pub mod cache;
pub mod config;
pub mod engine;
pub mod metadata;
pub mod observability;
pub mod planner;
pub mod request;
pub mod store;
