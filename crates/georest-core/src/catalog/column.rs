//! Column descriptors.

use serde::{Serialize, Serializer};

use super::types::{GeometryKind, LogicalType};

/// Description of one column of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Human-readable label.
    pub header: Option<String>,
    /// Logical type.
    pub logical_type: LogicalType,
    /// Normalized store type base name.
    pub store_type: String,
    /// Character length.
    pub length: Option<u32>,
    /// Numeric precision.
    pub precision: Option<u32>,
    /// Numeric scale.
    pub scale: Option<u32>,
    /// Whether values are fixed-precision decimals.
    pub exact_numeric: bool,
    /// Whether the column accepts null.
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    pub is_primary_key: bool,
    /// Resolved foreign key paths (`schema.table.column`).
    pub foreign_key_targets: Vec<String>,
    /// Server-side default.
    pub default: Option<serde_json::Value>,
    /// Coordinate reference system, for geometry columns.
    pub srid: Option<i32>,
    /// Whether this is the pseudo-column of a collection-valued relationship.
    pub is_collection_valued: bool,
}

impl ColumnDescriptor {
    /// Check if this is a geometry column.
    pub fn is_geometry(&self) -> bool {
        self.logical_type.is_geometry()
    }

    /// Declared geometry subtype.
    pub fn geometry_kind(&self) -> Option<GeometryKind> {
        match self.logical_type {
            LogicalType::Geometry(kind) => Some(kind),
            _ => None,
        }
    }

    /// Check if the column is declared as a geometry collection.
    pub fn is_geometry_collection(&self) -> bool {
        self.geometry_kind() == Some(GeometryKind::GeometryCollection)
    }

    /// Check if the column refers to other tables.
    pub fn has_foreign_keys(&self) -> bool {
        self.is_collection_valued || !self.foreign_key_targets.is_empty()
    }
}

/// Column as exposed in the table document.
#[derive(Serialize)]
struct ColumnDocument<'a> {
    column_name: &'a str,
    header: &'a str,
    #[serde(rename = "type")]
    logical_type: LogicalType,
    store_type: &'a str,
    length: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
    nullable: bool,
    default: &'a Option<serde_json::Value>,
    is_primary_key: bool,
    has_foreign_keys: bool,
    foreign_key_names: &'a [String],
    is_collection_valued: bool,
    is_geometry_column: bool,
    srid: Option<i32>,
}

impl Serialize for ColumnDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ColumnDocument {
            column_name: &self.name,
            header: self.header.as_deref().unwrap_or(&self.name),
            logical_type: self.logical_type,
            store_type: &self.store_type,
            length: self.length,
            precision: self.precision,
            scale: self.scale,
            nullable: self.nullable,
            default: &self.default,
            is_primary_key: self.is_primary_key,
            has_foreign_keys: self.has_foreign_keys(),
            foreign_key_names: &self.foreign_key_targets,
            is_collection_valued: self.is_collection_valued,
            is_geometry_column: self.is_geometry(),
            srid: self.srid,
        }
        .serialize(serializer)
    }
}
