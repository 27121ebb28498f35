//! Access plans produced by index selection.

use crate::metadata::IndexDescriptor;
use crate::planner::predicate::Predicate;

/// The store operation a plan resolves to, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOperation {
    PointGet,
    BatchGet,
    Query,
    Scan,
}

impl PlanOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanOperation::PointGet => "point_get",
            PlanOperation::BatchGet => "batch_get",
            PlanOperation::Query => "query",
            PlanOperation::Scan => "scan",
        }
    }
}

/// How a fetch will be executed: which operation, against which index,
/// with which predicates pushed into the key and which left over as
/// client- or store-side filters.
///
/// Every input predicate lands in exactly one of `key_conditions` and
/// `residual_filters`. Point and batch reads never carry residual
/// filters; a candidate that would need them is not eligible for those
/// operations.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPlan {
    pub table: String,
    pub operation: PlanOperation,
    /// Selected index. `None` exactly when `operation` is `Scan`.
    pub index: Option<IndexDescriptor>,
    pub key_conditions: Vec<Predicate>,
    pub residual_filters: Vec<Predicate>,
}

impl AccessPlan {
    /// Index name as the store expects it: `None` for the primary index
    /// and for scans.
    pub fn index_name(&self) -> Option<&str> {
        self.index.as_ref().and_then(|index| index.name.as_deref())
    }

    /// Label used in logs: the index name, "primary", or "none".
    pub fn index_label(&self) -> &str {
        self.index.as_ref().map(|index| index.label()).unwrap_or("none")
    }

    pub fn is_scan(&self) -> bool {
        self.operation == PlanOperation::Scan
    }

    pub fn has_residual_filters(&self) -> bool {
        !self.residual_filters.is_empty()
    }
}
