//! Placeholder-safe assembly of store expression clauses.
//!
//! Attribute names always travel as `#n` tokens and operands as `:v`
//! tokens, so reserved words and arbitrary caller-supplied names cannot
//! corrupt a clause. One builder instance serves every clause of a
//! single request; all clauses share its placeholder maps.

use crate::planner::{Operator, Predicate};
use crate::request::errors::{BuildError, BuildResult};
use crate::store::{AttributeValue, NamePlaceholders, ValuePlaceholders};

/// Clause position a predicate is rendered into. Key conditions accept a
/// narrower operator set than filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    KeyCondition,
    Filter,
}

#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    names: NamePlaceholders,
    values: ValuePlaceholders,
    next_value: usize,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        ExpressionBuilder::default()
    }

    /// Token for an attribute name, reused across clauses for repeated
    /// attributes.
    pub fn name_token(&mut self, attribute: &str) -> String {
        let existing = self
            .names
            .iter()
            .find(|(_, name)| name.as_str() == attribute)
            .map(|(token, _)| token.clone());
        match existing {
            Some(token) => token,
            None => {
                let token = format!("#n{}", self.names.len());
                self.names.insert(token.clone(), attribute.to_string());
                token
            }
        }
    }

    /// Fresh token for one operand value.
    pub fn value_token(&mut self, value: AttributeValue) -> String {
        let token = format!(":v{}", self.next_value);
        self.next_value += 1;
        self.values.insert(token.clone(), value);
        token
    }

    /// Renders one predicate into clause text.
    pub fn predicate(&mut self, predicate: &Predicate, clause: Clause) -> BuildResult<String> {
        let invalid = |operator: &'static str, kind: &str| BuildError::InvalidOperator {
            operator,
            attribute: predicate.field.clone(),
            kind: kind.to_string(),
        };
        let name = self.name_token(&predicate.field);
        match &predicate.operator {
            Operator::Eq(value) => {
                if clause == Clause::KeyCondition && value.is_null() {
                    return Err(invalid("eq", "null"));
                }
                Ok(format!("{} = {}", name, self.value_token(value.clone())))
            }
            Operator::In(values) => {
                if clause == Clause::KeyCondition {
                    return Err(invalid("in", "key condition"));
                }
                let tokens: Vec<String> = values
                    .iter()
                    .map(|value| self.value_token(value.clone()))
                    .collect();
                Ok(format!("{} IN ({})", name, tokens.join(", ")))
            }
            Operator::IsNil => {
                if clause == Clause::KeyCondition {
                    return Err(invalid("is_nil", "key condition"));
                }
                let null = self.value_token(AttributeValue::Null);
                Ok(format!(
                    "(attribute_not_exists({name}) OR {name} = {null})",
                    name = name,
                    null = null
                ))
            }
            Operator::Between(low, high) => {
                for bound in [low, high] {
                    if !bound.is_comparable() {
                        return Err(invalid("between", bound.type_name()));
                    }
                }
                Ok(format!(
                    "{} BETWEEN {} AND {}",
                    name,
                    self.value_token(low.clone()),
                    self.value_token(high.clone())
                ))
            }
            Operator::BeginsWith(prefix) => Ok(format!(
                "begins_with({}, {})",
                name,
                self.value_token(AttributeValue::string(prefix.clone()))
            )),
        }
    }

    /// Renders a key-condition clause; the predicate list must not be
    /// empty.
    pub fn key_condition(&mut self, predicates: &[Predicate]) -> BuildResult<String> {
        let clauses = predicates
            .iter()
            .map(|predicate| self.predicate(predicate, Clause::KeyCondition))
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(clauses.join(" AND "))
    }

    /// Renders a filter clause, `None` when there is nothing to filter.
    pub fn filter(&mut self, predicates: &[Predicate]) -> BuildResult<Option<String>> {
        if predicates.is_empty() {
            return Ok(None);
        }
        let clauses = predicates
            .iter()
            .map(|predicate| self.predicate(predicate, Clause::Filter))
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(Some(clauses.join(" AND ")))
    }

    /// Conditional-write clause asserting the attribute is absent.
    pub fn attribute_absent(&mut self, attribute: &str) -> String {
        format!("attribute_not_exists({})", self.name_token(attribute))
    }

    /// Projection clause over the given attribute names.
    pub fn projection(&mut self, attributes: &[String]) -> String {
        let tokens: Vec<String> = attributes
            .iter()
            .map(|attribute| self.name_token(attribute))
            .collect();
        tokens.join(", ")
    }

    /// `#f = :v` assignment for a SET section.
    pub fn assign(&mut self, field: &str, value: AttributeValue) -> String {
        format!("{} = {}", self.name_token(field), self.value_token(value))
    }

    /// `#f = list_append(:v, #f)` assignment for a SET section.
    pub fn assign_prepend(&mut self, field: &str, value: AttributeValue) -> String {
        let name = self.name_token(field);
        format!(
            "{name} = list_append({value}, {name})",
            name = name,
            value = self.value_token(value)
        )
    }

    /// `#f` operand for a REMOVE section.
    pub fn remove_field(&mut self, field: &str) -> String {
        self.name_token(field)
    }

    /// `#f[i]` operand for a REMOVE section.
    pub fn remove_index(&mut self, field: &str, index: usize) -> String {
        format!("{}[{}]", self.name_token(field), index)
    }

    /// `#f :v` operand for an ADD or DELETE section.
    pub fn field_operand(&mut self, field: &str, value: AttributeValue) -> String {
        format!("{} {}", self.name_token(field), self.value_token(value))
    }

    pub fn into_parts(self) -> (NamePlaceholders, ValuePlaceholders) {
        (self.names, self.values)
    }
}

/// Joins update sections into one clause, skipping empty sections.
/// Section order is fixed: SET, REMOVE, ADD, DELETE.
pub fn update_clause(
    sets: &[String],
    removes: &[String],
    adds: &[String],
    deletes: &[String],
) -> String {
    let mut sections = Vec::new();
    for (keyword, operands) in [
        ("SET", sets),
        ("REMOVE", removes),
        ("ADD", adds),
        ("DELETE", deletes),
    ] {
        if !operands.is_empty() {
            sections.push(format!("{} {}", keyword, operands.join(", ")));
        }
    }
    sections.join(" ")
}
