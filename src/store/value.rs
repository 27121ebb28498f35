//! Attribute value model for the partitioned store
//!
//! Values carry the store's declared scalar/document/set types. Items are
//! ordered maps so that serialized requests, log output, and test
//! assertions are deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A stored record: attribute name -> attribute value.
///
/// `BTreeMap` keeps attribute iteration order deterministic.
pub type Item = BTreeMap<String, AttributeValue>;

/// A typed store attribute value.
///
/// Numbers travel as decimal strings, matching the store's lossless number
/// encoding. Sets are kept as ordered vectors of their element encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// UTF-8 string
    S(String),
    /// Number, encoded as a decimal string
    N(String),
    /// Binary blob
    B(Vec<u8>),
    /// Boolean
    Bool(bool),
    /// Explicit null marker
    Null,
    /// Heterogeneous list
    L(Vec<AttributeValue>),
    /// Nested document
    M(Item),
    /// String set
    SS(Vec<String>),
    /// Number set (decimal strings)
    NS(Vec<String>),
}

impl AttributeValue {
    /// Create a string value
    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue::S(value.into())
    }

    /// Create a number value from anything that formats as a decimal
    pub fn number(value: impl ToString) -> Self {
        AttributeValue::N(value.to_string())
    }

    /// Returns the type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "string",
            AttributeValue::N(_) => "number",
            AttributeValue::B(_) => "binary",
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Null => "null",
            AttributeValue::L(_) => "list",
            AttributeValue::M(_) => "map",
            AttributeValue::SS(_) => "string_set",
            AttributeValue::NS(_) => "number_set",
        }
    }

    /// Returns true for the explicit null marker
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Returns the string payload if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the decimal payload parsed as f64 if this is a number value
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::N(n) => n.parse().ok(),
            _ => None,
        }
    }

    /// Returns true if values of this type have a total order in the store
    /// (usable with `between` and sort-key comparisons)
    pub fn is_comparable(&self) -> bool {
        matches!(
            self,
            AttributeValue::S(_) | AttributeValue::N(_) | AttributeValue::B(_)
        )
    }

    /// Convert a loosely-typed JSON value into the store's typed encoding.
    ///
    /// Used when normalizing caller-supplied condition trees and fixtures.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(*b),
            serde_json::Value::Number(n) => AttributeValue::N(n.to_string()),
            serde_json::Value::String(s) => AttributeValue::S(s.clone()),
            serde_json::Value::Array(values) => {
                AttributeValue::L(values.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(fields) => AttributeValue::M(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::S(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::N(value.to_string())
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        AttributeValue::N(value.to_string())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::N(value.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Builds an [`Item`] from (name, value) pairs.
pub fn item(attributes: impl IntoIterator<Item = (&'static str, AttributeValue)>) -> Item {
    attributes
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}
