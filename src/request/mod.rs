//! Translation of plans and mutations into store requests.
//!
//! Clause text always goes through the placeholder-safe expression
//! builder; nil-field and conflict policies are applied here so the
//! engine deals only in finished [`StoreRequest`] values.
//!
//! [`StoreRequest`]: crate::store::StoreRequest

mod builder;
mod errors;
mod expression;
mod options;

pub use builder::{build_delete, build_fetch, build_put, build_update, primary_key};
pub use errors::{BuildError, BuildResult};
pub use expression::{update_clause, Clause, ExpressionBuilder};
pub use options::{CallOptions, OnConflict, Projection, UpdateDirectives, WriteOptions};
