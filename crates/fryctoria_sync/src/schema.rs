//! Static relationship schema.
//!
//! Replay needs to know which fields of a record hold references to other
//! records so it can rewrite local ids. Types declare this up front.

use std::collections::HashMap;

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    /// Field holds a single id (or null).
    BelongsTo,
    /// Field holds an array of ids.
    HasMany,
}

/// One relationship field of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Field name on the record.
    pub name: String,
    /// Cardinality.
    pub kind: RelationshipKind,
    /// Type of the referenced records.
    pub target_type: String,
}

impl Relationship {
    /// Declares a to-one relationship.
    pub fn belongs_to(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RelationshipKind::BelongsTo,
            target_type: target_type.into(),
        }
    }

    /// Declares a to-many relationship.
    pub fn has_many(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RelationshipKind::HasMany,
            target_type: target_type.into(),
        }
    }
}

/// Describes one record type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Relationship fields of the type.
    pub relationships: Vec<Relationship>,
}

/// Relationship metadata for every known type.
///
/// Types that were never declared have no relationships.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: HashMap<String, TypeDescriptor>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a type and its relationships.
    pub fn with_type(
        mut self,
        type_name: impl Into<String>,
        relationships: impl IntoIterator<Item = Relationship>,
    ) -> Self {
        self.types.insert(
            type_name.into(),
            TypeDescriptor {
                relationships: relationships.into_iter().collect(),
            },
        );
        self
    }

    /// Returns the descriptor of `type_name`.
    pub fn model_for(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    /// Returns the relationships of `type_name` (empty if undeclared).
    pub fn relationships(&self, type_name: &str) -> &[Relationship] {
        self.types
            .get(type_name)
            .map(|t| t.relationships.as_slice())
            .unwrap_or(&[])
    }
}
