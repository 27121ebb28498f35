//! Planner error types.

use thiserror::Error;

/// Errors raised while turning a condition list into an access plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// No index can serve the predicates and the table may not be scanned
    /// as a fallback.
    #[error("no index on table '{table}' matches the supplied conditions")]
    NoMatchingIndex { table: String },

    /// The caller asked for a full scan of a table that is not approved
    /// for scanning.
    #[error("table '{table}' is not approved for scanning")]
    ScanNotAllowed { table: String },

    /// A null-test was placed on a key attribute of the selected index.
    /// Key attributes are always present, so the filter can never match.
    #[error("cannot null-test '{attribute}': it is a key attribute of index '{index}'")]
    UnsupportedKeyFilter { attribute: String, index: String },

    /// A condition value could not be interpreted as any known operator.
    #[error("malformed condition on field '{field}': {reason}")]
    MalformedCondition { field: String, reason: String },
}

pub type PlanResult<T> = Result<T, PlanError>;
