//! Planner-facing view of a table's key structure
//!
//! A described table is flattened into one [`IndexDescriptor`] per access
//! path: the table's own key first, then each secondary index in the
//! order the store reports them. The planner relies on that order when
//! breaking ties between equally good candidates.

use serde::{Deserialize, Serialize};

use crate::store::{Item, KeyAttributeType, KeySchema, ProjectionKind, TableDescription};

use super::errors::{MetadataError, MetadataResult};

/// One way to reach records in a table: the primary key or a secondary
/// index, with key attribute types resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name; `None` is the table's own key
    pub name: Option<String>,
    /// Partition-determining attribute
    pub hash_attribute: String,
    /// Declared type of the hash attribute
    pub hash_type: KeyAttributeType,
    /// Sort-key attribute, when the key is composite
    pub range_attribute: Option<String>,
    /// Declared type of the sort-key attribute
    pub range_type: Option<KeyAttributeType>,
    /// Attributes the index carries
    pub projection: ProjectionKind,
}

impl IndexDescriptor {
    fn resolve(
        name: Option<String>,
        key_schema: &KeySchema,
        projection: ProjectionKind,
        description: &TableDescription,
    ) -> MetadataResult<Self> {
        let missing = |attribute: &str| MetadataError::MissingAttributeDefinition {
            table: description.table_name.clone(),
            attribute: attribute.to_string(),
        };

        let hash_type = description
            .attribute_type(&key_schema.hash_attribute)
            .ok_or_else(|| missing(&key_schema.hash_attribute))?;

        let range_type = match &key_schema.range_attribute {
            Some(attribute) => Some(
                description
                    .attribute_type(attribute)
                    .ok_or_else(|| missing(attribute))?,
            ),
            None => None,
        };

        Ok(Self {
            name,
            hash_attribute: key_schema.hash_attribute.clone(),
            hash_type,
            range_attribute: key_schema.range_attribute.clone(),
            range_type,
            projection,
        })
    }

    /// Returns true for the table's own key
    pub fn is_primary(&self) -> bool {
        self.name.is_none()
    }

    /// Returns true when the key is composite
    pub fn has_range(&self) -> bool {
        self.range_attribute.is_some()
    }

    /// Name used in plans and log fields
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("primary")
    }

    /// Returns true when `attribute` is part of this index's key
    pub fn is_key_attribute(&self, attribute: &str) -> bool {
        self.hash_attribute == attribute || self.range_attribute.as_deref() == Some(attribute)
    }
}

/// Resolved key structure of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Table name
    pub table: String,
    /// The table's own key
    pub primary: IndexDescriptor,
    /// Secondary indexes, in the order the store reports them
    pub secondary: Vec<IndexDescriptor>,
}

impl TableMetadata {
    /// Flattens a table description into planner-facing descriptors.
    ///
    /// Fails when a key attribute referenced by the table or any index has
    /// no declared type.
    pub fn from_description(description: &TableDescription) -> MetadataResult<Self> {
        let primary = IndexDescriptor::resolve(
            None,
            &description.key_schema,
            ProjectionKind::All,
            description,
        )?;

        let secondary = description
            .secondary_indexes
            .iter()
            .map(|index| {
                IndexDescriptor::resolve(
                    Some(index.name.clone()),
                    &index.key_schema,
                    index.projection.clone(),
                    description,
                )
            })
            .collect::<MetadataResult<Vec<_>>>()?;

        Ok(Self {
            table: description.table_name.clone(),
            primary,
            secondary,
        })
    }

    /// All access paths, primary first, then secondary indexes in
    /// declaration order
    pub fn indexes(&self) -> impl Iterator<Item = &IndexDescriptor> {
        std::iter::once(&self.primary).chain(self.secondary.iter())
    }

    /// Looks up an access path by name; `None` returns the primary
    pub fn index_named(&self, name: Option<&str>) -> Option<&IndexDescriptor> {
        match name {
            None => Some(&self.primary),
            Some(name) => self.secondary.iter().find(|ix| ix.name.as_deref() == Some(name)),
        }
    }

    /// Extracts the full primary key of `record` if every key attribute is
    /// present
    pub fn primary_key_of(&self, record: &Item) -> Option<Item> {
        let mut key = Item::new();
        let hash = &self.primary.hash_attribute;
        key.insert(hash.clone(), record.get(hash)?.clone());
        if let Some(range) = &self.primary.range_attribute {
            key.insert(range.clone(), record.get(range)?.clone());
        }
        Some(key)
    }
}
