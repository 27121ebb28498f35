//! Request-builder error types.

use thiserror::Error;

/// Errors raised while compiling a plan or mutation into a store request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    /// An operator was applied to an operand type that cannot support it.
    #[error("operator '{operator}' cannot take a {kind} operand on attribute '{attribute}'")]
    InvalidOperator {
        operator: &'static str,
        attribute: String,
        kind: String,
    },

    /// A mutation is missing part of the table's primary key.
    #[error("mutation on table '{table}' is missing key attribute '{attribute}'")]
    IncompleteKey { table: String, attribute: String },

    /// An update compiled to no clauses at all.
    #[error("update on table '{table}' contains no changes")]
    EmptyUpdate { table: String },

    /// The access plan violates a builder invariant. Plans produced by the
    /// index selector never trip this.
    #[error("malformed plan for table '{table}': {reason}")]
    MalformedPlan { table: String, reason: &'static str },
}

pub type BuildResult<T> = Result<T, BuildError>;
