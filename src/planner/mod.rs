//! Predicate normalization and index selection.
//!
//! Turns ordered, loosely-typed condition lists into typed predicates,
//! then maps them to the cheapest store operation the table's indexes
//! can serve. Selection is deterministic; scan fallback is opt-in per
//! table.

mod errors;
mod plan;
mod planner;
mod predicate;

pub use errors::{PlanError, PlanResult};
pub use plan::{AccessPlan, PlanOperation};
pub use planner::{IndexSelector, ScanPolicy};
pub use predicate::{normalize, Operator, Predicate};
