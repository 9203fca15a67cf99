//! Relationship descriptors.

use serde::Serialize;

use super::metadata::Cardinality;

/// Description of a relationship to another table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationDescriptor {
    /// Relationship name.
    pub name: String,
    /// Table on the far side.
    pub target_table: String,
    /// Relationship cardinality.
    pub cardinality: Cardinality,
    /// Whether the far side holds many records.
    pub is_collection_valued: bool,
    /// Foreign key columns connecting the two tables.
    pub connected_foreign_keys: Vec<String>,
}
