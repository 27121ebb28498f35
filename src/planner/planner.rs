//! Index selection: maps a predicate list to the cheapest store read.
//!
//! Candidate indexes are those whose hash attribute is bound by an `eq`
//! or `in` predicate. Survivors are ranked structurally and the plan is
//! built from the winner; with no survivor the table is scanned when
//! policy permits.

use crate::metadata::{IndexDescriptor, TableMetadata};
use crate::planner::errors::{PlanError, PlanResult};
use crate::planner::plan::{AccessPlan, PlanOperation};
use crate::planner::predicate::{Operator, Predicate};

/// Whether a plan may resolve to a full table scan. Derived per call from
/// configuration and the caller's inline override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy {
    allowed: bool,
}

impl ScanPolicy {
    pub fn new(allowed: bool) -> Self {
        ScanPolicy { allowed }
    }

    pub fn allowed() -> Self {
        ScanPolicy::new(true)
    }

    pub fn denied() -> Self {
        ScanPolicy::new(false)
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// One viable way to serve the predicates through an index. Predicates
/// are referenced by position so duplicates on one field stay distinct.
struct Candidate<'a> {
    /// Position in declaration order (primary first), breaks rank ties.
    position: usize,
    index: &'a IndexDescriptor,
    operation: PlanOperation,
    hash_position: usize,
    range_position: Option<usize>,
}

impl Candidate<'_> {
    /// Rank key, compared descending: a composite index outranks a
    /// hash-only one, and within equal structure a pushed range predicate
    /// outranks an unpushed one. Remaining ties fall to the earliest
    /// index in declaration order (primary first).
    fn rank(&self) -> (bool, bool, std::cmp::Reverse<usize>) {
        (
            self.index.has_range(),
            self.range_position.is_some(),
            std::cmp::Reverse(self.position),
        )
    }
}

/// Selects an access path for one table's resolved key metadata.
pub struct IndexSelector<'a> {
    metadata: &'a TableMetadata,
}

impl<'a> IndexSelector<'a> {
    pub fn new(metadata: &'a TableMetadata) -> Self {
        IndexSelector { metadata }
    }

    /// Maps `predicates` to an access plan.
    ///
    /// Selection is deterministic: rank ties resolve to the primary
    /// index, then to secondary declaration order. When several
    /// predicates could bind the same key slot, the first in caller
    /// order wins.
    pub fn plan(&self, predicates: &[Predicate], policy: ScanPolicy) -> PlanResult<AccessPlan> {
        let best = self
            .metadata
            .indexes()
            .enumerate()
            .filter_map(|(position, index)| evaluate(position, index, predicates))
            .fold(None::<Candidate>, |best, candidate| match best {
                Some(current) if candidate.rank() <= current.rank() => Some(current),
                _ => Some(candidate),
            });

        match best {
            Some(candidate) => self.keyed_plan(candidate, predicates),
            None => self.scan_plan(predicates, policy),
        }
    }

    fn keyed_plan(
        &self,
        candidate: Candidate<'a>,
        predicates: &[Predicate],
    ) -> PlanResult<AccessPlan> {
        // Key attributes are always present in stored records, so a
        // null-test against the selected index's key cannot match.
        for predicate in predicates {
            if matches!(predicate.operator, Operator::IsNil)
                && candidate.index.is_key_attribute(&predicate.field)
            {
                return Err(PlanError::UnsupportedKeyFilter {
                    attribute: predicate.field.clone(),
                    index: candidate.index.label().to_string(),
                });
            }
        }

        // Hash condition first, then the pushed range condition.
        let mut key_conditions = vec![predicates[candidate.hash_position].clone()];
        if let Some(range_position) = candidate.range_position {
            key_conditions.push(predicates[range_position].clone());
        }
        let residual_filters = predicates
            .iter()
            .enumerate()
            .filter(|(position, _)| {
                *position != candidate.hash_position && Some(*position) != candidate.range_position
            })
            .map(|(_, predicate)| predicate.clone())
            .collect();

        Ok(AccessPlan {
            table: self.metadata.table.clone(),
            operation: candidate.operation,
            index: Some(candidate.index.clone()),
            key_conditions,
            residual_filters,
        })
    }

    fn scan_plan(&self, predicates: &[Predicate], policy: ScanPolicy) -> PlanResult<AccessPlan> {
        if !policy.is_allowed() {
            // An empty condition list asks for the whole table outright;
            // anything else is an index miss.
            if predicates.is_empty() {
                return Err(PlanError::ScanNotAllowed {
                    table: self.metadata.table.clone(),
                });
            }
            return Err(PlanError::NoMatchingIndex {
                table: self.metadata.table.clone(),
            });
        }
        Ok(AccessPlan {
            table: self.metadata.table.clone(),
            operation: PlanOperation::Scan,
            index: None,
            key_conditions: Vec::new(),
            residual_filters: predicates.to_vec(),
        })
    }
}

fn evaluate<'a>(
    position: usize,
    index: &'a IndexDescriptor,
    predicates: &[Predicate],
) -> Option<Candidate<'a>> {
    let hash_position = predicates
        .iter()
        .position(|p| p.field == index.hash_attribute && p.operator.is_hash_usable())?;

    match &predicates[hash_position].operator {
        Operator::In(hash_values) => {
            batch_candidate(position, index, predicates, hash_position, hash_values.len())
        }
        _ => Some(keyed_candidate(position, index, predicates, hash_position)),
    }
}

/// An `in` on the hash key fans out to a batch read. Batch reads address
/// only the table's own key, carry no filters, and on a composite key
/// need a range list that zips one-to-one with the hash list.
fn batch_candidate<'a>(
    position: usize,
    index: &'a IndexDescriptor,
    predicates: &[Predicate],
    hash_position: usize,
    hash_count: usize,
) -> Option<Candidate<'a>> {
    if !index.is_primary() {
        return None;
    }
    let range_position = match &index.range_attribute {
        None => None,
        Some(range_attribute) => {
            let (found, count) = predicates.iter().enumerate().find_map(|(i, p)| {
                if p.field != *range_attribute {
                    return None;
                }
                match &p.operator {
                    Operator::Eq(_) => Some((i, 1)),
                    Operator::In(values) => Some((i, values.len())),
                    _ => None,
                }
            })?;
            if count != hash_count {
                return None;
            }
            Some(found)
        }
    };
    let consumed = 1 + usize::from(range_position.is_some());
    if predicates.len() != consumed {
        return None;
    }
    Some(Candidate {
        position,
        index,
        operation: PlanOperation::BatchGet,
        hash_position,
        range_position,
    })
}

fn keyed_candidate<'a>(
    position: usize,
    index: &'a IndexDescriptor,
    predicates: &[Predicate],
    hash_position: usize,
) -> Candidate<'a> {
    let range_position = index.range_attribute.as_ref().and_then(|range_attribute| {
        predicates
            .iter()
            .position(|p| p.field == *range_attribute && p.operator.is_range_usable())
    });
    // A lone eq on a hash-only primary key addresses one record directly.
    // Composite keys and secondary indexes always go through query.
    let operation = if index.is_primary() && !index.has_range() && predicates.len() == 1 {
        PlanOperation::PointGet
    } else {
        PlanOperation::Query
    };
    Candidate {
        position,
        index,
        operation,
        hash_position,
        range_position,
    }
}
