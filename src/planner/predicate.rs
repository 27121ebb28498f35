//! Typed predicates and normalization of loosely-typed condition lists.
//!
//! Callers hand conditions over as ordered `(field, JSON value)` pairs.
//! The JSON shape selects the operator:
//!
//! - scalar                          -> `eq`
//! - `null`                          -> `is_nil`
//! - array                           -> `in`
//! - `{"between": [low, high]}`      -> `between`
//! - `{"begins_with": "prefix"}`     -> `begins_with`
//! - `{"eq": ...}` / `{"in": [...]}` -> explicit forms
//!
//! A bare object is always read as an operator spec. Matching a literal
//! map value therefore requires the explicit `{"eq": {...}}` form.

use serde_json::Value as JsonValue;

use crate::planner::errors::{PlanError, PlanResult};
use crate::store::AttributeValue;

/// Comparison operator paired with its operand(s).
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Eq(AttributeValue),
    In(Vec<AttributeValue>),
    IsNil,
    Between(AttributeValue, AttributeValue),
    BeginsWith(String),
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq(_) => "eq",
            Operator::In(_) => "in",
            Operator::IsNil => "is_nil",
            Operator::Between(_, _) => "between",
            Operator::BeginsWith(_) => "begins_with",
        }
    }

    /// Whether this operator can bind a hash key. `Eq` addresses a single
    /// partition, `In` fans out to a batch read.
    pub fn is_hash_usable(&self) -> bool {
        matches!(self, Operator::Eq(_) | Operator::In(_))
    }

    /// Whether the store accepts this operator in a key condition on a
    /// range attribute.
    pub fn is_range_usable(&self) -> bool {
        matches!(
            self,
            Operator::Eq(_) | Operator::Between(_, _) | Operator::BeginsWith(_)
        )
    }
}

/// A single condition on one attribute. Order within a condition list is
/// significant: when several predicates could bind the same key slot, the
/// first one in caller order wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Predicate {
            field: field.into(),
            operator: Operator::Eq(value.into()),
        }
    }

    pub fn is_in(field: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Predicate {
            field: field.into(),
            operator: Operator::In(values),
        }
    }

    pub fn is_nil(field: impl Into<String>) -> Self {
        Predicate {
            field: field.into(),
            operator: Operator::IsNil,
        }
    }

    pub fn between(
        field: impl Into<String>,
        low: impl Into<AttributeValue>,
        high: impl Into<AttributeValue>,
    ) -> Self {
        Predicate {
            field: field.into(),
            operator: Operator::Between(low.into(), high.into()),
        }
    }

    pub fn begins_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Predicate {
            field: field.into(),
            operator: Operator::BeginsWith(prefix.into()),
        }
    }

    pub fn operator_name(&self) -> &'static str {
        self.operator.name()
    }
}

/// Converts an ordered list of loosely-typed conditions into typed
/// predicates, preserving caller order.
pub fn normalize(
    conditions: impl IntoIterator<Item = (String, JsonValue)>,
) -> PlanResult<Vec<Predicate>> {
    conditions
        .into_iter()
        .map(|(field, value)| normalize_one(field, value))
        .collect()
}

fn normalize_one(field: String, value: JsonValue) -> PlanResult<Predicate> {
    let operator = match value {
        JsonValue::Null => Operator::IsNil,
        JsonValue::Array(entries) => Operator::In(in_list(&field, &entries)?),
        JsonValue::Object(spec) => operator_spec(&field, spec)?,
        scalar => Operator::Eq(AttributeValue::from_json(&scalar)),
    };
    Ok(Predicate { field, operator })
}

fn in_list(field: &str, entries: &[JsonValue]) -> PlanResult<Vec<AttributeValue>> {
    if entries.is_empty() {
        return Err(PlanError::MalformedCondition {
            field: field.to_string(),
            reason: "'in' requires at least one value".to_string(),
        });
    }
    Ok(entries.iter().map(AttributeValue::from_json).collect())
}

fn operator_spec(
    field: &str,
    spec: serde_json::Map<String, JsonValue>,
) -> PlanResult<Operator> {
    let malformed = |reason: &str| PlanError::MalformedCondition {
        field: field.to_string(),
        reason: reason.to_string(),
    };
    let mut entries = spec.into_iter();
    let (name, operand) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => return Err(malformed("operator spec must hold exactly one key")),
    };
    match name.as_str() {
        "eq" => Ok(Operator::Eq(AttributeValue::from_json(&operand))),
        "in" => match operand {
            JsonValue::Array(entries) => Ok(Operator::In(in_list(field, &entries)?)),
            _ => Err(malformed("'in' requires an array of values")),
        },
        "is_nil" => match operand {
            JsonValue::Bool(true) => Ok(Operator::IsNil),
            _ => Err(malformed("'is_nil' requires the literal true")),
        },
        "between" => match operand {
            JsonValue::Array(bounds) if bounds.len() == 2 => Ok(Operator::Between(
                AttributeValue::from_json(&bounds[0]),
                AttributeValue::from_json(&bounds[1]),
            )),
            _ => Err(malformed("'between' requires a two-element [low, high] array")),
        },
        "begins_with" => match operand {
            JsonValue::String(prefix) => Ok(Operator::BeginsWith(prefix)),
            _ => Err(malformed("'begins_with' requires a string prefix")),
        },
        other => Err(malformed(&format!("unknown operator '{}'", other))),
    }
}
