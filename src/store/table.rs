//! Table and index shapes exchanged with the store
//!
//! These are the declarative structures carried by CreateTable/UpdateTable
//! requests and returned by DescribeTable. The planner-facing view of the
//! same information lives in `metadata`.

use serde::{Deserialize, Serialize};

/// Declared type of a key attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyAttributeType {
    /// String
    S,
    /// Number
    N,
    /// Binary
    B,
}

impl KeyAttributeType {
    /// Returns the single-letter code the store uses
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAttributeType::S => "S",
            KeyAttributeType::N => "N",
            KeyAttributeType::B => "B",
        }
    }
}

/// Name and declared type of one key attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute name
    pub name: String,
    /// Declared key type
    pub attribute_type: KeyAttributeType,
}

impl AttributeDefinition {
    /// Shorthand constructor
    pub fn new(name: impl Into<String>, attribute_type: KeyAttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

/// Hash (and optional range) attribute names for a table or index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    /// Partition-determining attribute; matched by equality for any
    /// indexed access
    pub hash_attribute: String,
    /// Optional sort-key attribute
    pub range_attribute: Option<String>,
}

impl KeySchema {
    /// Hash-only key schema
    pub fn hash(hash_attribute: impl Into<String>) -> Self {
        Self {
            hash_attribute: hash_attribute.into(),
            range_attribute: None,
        }
    }

    /// Composite hash + range key schema
    pub fn composite(
        hash_attribute: impl Into<String>,
        range_attribute: impl Into<String>,
    ) -> Self {
        Self {
            hash_attribute: hash_attribute.into(),
            range_attribute: Some(range_attribute.into()),
        }
    }
}

/// Which non-key attributes a secondary index carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    /// Index carries every attribute
    All,
    /// Index carries only the key attributes
    KeysOnly,
    /// Index carries the key attributes plus the named ones
    Include(Vec<String>),
}

/// Definition of one secondary index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndexDefinition {
    /// Index name
    pub name: String,
    /// Index key schema
    pub key_schema: KeySchema,
    /// Projection carried by the index
    pub projection: ProjectionKind,
}

/// Full declarative shape submitted with CreateTable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name
    pub table_name: String,
    /// Declared types for every key attribute referenced by the table or
    /// any secondary index
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Primary key schema
    pub key_schema: KeySchema,
    /// Secondary indexes, in declaration order
    pub secondary_indexes: Vec<SecondaryIndexDefinition>,
    /// Provisioned (read, write) capacity, if the table is provisioned
    pub provisioned_throughput: Option<(u64, u64)>,
}

/// Index changes submitted with UpdateTable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableChanges {
    /// Attribute declarations for any newly indexed attributes
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Secondary indexes to create
    pub create_indexes: Vec<SecondaryIndexDefinition>,
    /// Secondary index names to delete
    pub delete_indexes: Vec<String>,
}

/// Lifecycle status reported for a table or secondary index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TableStatus {
    /// Being created
    Creating,
    /// An index build or capacity change is in flight
    Updating,
    /// Being deleted
    Deleting,
    /// Ready to serve
    Active,
}

impl TableStatus {
    /// Returns true when the resource can serve reads and writes
    pub fn is_active(&self) -> bool {
        matches!(self, TableStatus::Active)
    }

    /// Returns the status name the store reports
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Creating => "CREATING",
            TableStatus::Updating => "UPDATING",
            TableStatus::Deleting => "DELETING",
            TableStatus::Active => "ACTIVE",
        }
    }
}

/// Described state of one secondary index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndexDescription {
    /// Index name
    pub name: String,
    /// Index key schema
    pub key_schema: KeySchema,
    /// Projection carried by the index
    pub projection: ProjectionKind,
    /// Index lifecycle status
    pub status: TableStatus,
}

/// DescribeTable payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    /// Table name
    pub table_name: String,
    /// Table lifecycle status
    pub status: TableStatus,
    /// Declared key attribute types
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Primary key schema
    pub key_schema: KeySchema,
    /// Secondary indexes, in the order the store reports them
    pub secondary_indexes: Vec<SecondaryIndexDescription>,
}

impl TableDescription {
    /// Returns true when the table and every secondary index are active
    pub fn all_active(&self) -> bool {
        self.status.is_active() && self.secondary_indexes.iter().all(|i| i.status.is_active())
    }

    /// Looks up the declared type of a key attribute
    pub fn attribute_type(&self, name: &str) -> Option<KeyAttributeType> {
        self.attribute_definitions
            .iter()
            .find(|def| def.name == name)
            .map(|def| def.attribute_type)
    }
}
