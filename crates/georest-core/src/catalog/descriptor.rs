//! Schema descriptors.
//!
//! A [`SchemaDescriptor`] is the reflected description of one table. It is
//! immutable once built and is the only view of the table that the filter
//! compiler, the executor and the serializer consult.

use std::collections::HashSet;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, instrument};

use super::column::ColumnDescriptor;
use super::metadata::{RawColumn, TableMetadata};
use super::relation::RelationDescriptor;
use super::types::{LogicalType, StoreType};
use crate::error::SchemaError;

/// Description of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    schema_name: String,
    table_name: String,
    columns: Vec<ColumnDescriptor>,
    relationships: Vec<RelationDescriptor>,
    primary_key_column_names: Vec<String>,
    geometry_column_names: Vec<String>,
}

/// Describe a table from its raw metadata.
///
/// Deterministic in the metadata. Fails only when a column cannot be
/// described: an unresolvable foreign key, a geometry column without a
/// coordinate reference system, or a duplicated name.
#[instrument(skip_all, fields(schema = %metadata.schema, table = %metadata.name))]
pub fn describe(metadata: &TableMetadata) -> Result<SchemaDescriptor, SchemaError> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(metadata.columns.len() + metadata.relationships.len());

    for raw in &metadata.columns {
        if !seen.insert(raw.name.as_str()) {
            return Err(SchemaError::DuplicateColumn {
                table: metadata.name.clone(),
                column: raw.name.clone(),
            });
        }
        columns.push(describe_column(&metadata.name, raw)?);
    }

    let mut relationships = Vec::with_capacity(metadata.relationships.len());
    for raw in &metadata.relationships {
        let relation = RelationDescriptor {
            name: raw.name.clone(),
            target_table: raw.target_table.clone(),
            cardinality: raw.cardinality,
            is_collection_valued: raw.cardinality.is_collection_valued(),
            connected_foreign_keys: raw.foreign_keys.clone(),
        };

        if relation.is_collection_valued {
            if !seen.insert(raw.name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    table: metadata.name.clone(),
                    column: raw.name.clone(),
                });
            }
            columns.push(relation_column(&relation));
        }
        relationships.push(relation);
    }

    let mut primary_key_column_names: Vec<String> = columns
        .iter()
        .filter(|c| c.is_primary_key)
        .map(|c| c.name.clone())
        .collect();
    primary_key_column_names.sort();

    let geometry_column_names = columns
        .iter()
        .filter(|c| c.is_geometry())
        .map(|c| c.name.clone())
        .collect();

    let descriptor = SchemaDescriptor {
        schema_name: metadata.schema.clone(),
        table_name: metadata.name.clone(),
        columns,
        relationships,
        primary_key_column_names,
        geometry_column_names,
    };

    debug!(
        columns = descriptor.columns.len(),
        primary_keys = descriptor.primary_key_column_names.len(),
        geometries = descriptor.geometry_column_names.len(),
        "described table"
    );

    Ok(descriptor)
}

fn describe_column(table: &str, raw: &RawColumn) -> Result<ColumnDescriptor, SchemaError> {
    let store_type = StoreType::parse(&raw.type_name);
    let logical_type = store_type.logical_type();

    let foreign_key_targets = raw
        .foreign_keys
        .iter()
        .map(|fk| {
            fk.resolve().ok_or_else(|| SchemaError::UnresolvedForeignKey {
                table: table.to_string(),
                column: raw.name.clone(),
                reference: fk.describe(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let srid = if logical_type.is_geometry() {
        let srid = raw.srid.or_else(|| store_type.srid()).ok_or_else(|| {
            SchemaError::MissingSrid {
                table: table.to_string(),
                column: raw.name.clone(),
            }
        })?;
        Some(srid)
    } else {
        None
    };

    Ok(ColumnDescriptor {
        name: raw.name.clone(),
        header: raw.header.clone(),
        logical_type,
        length: store_type.length(),
        precision: store_type.precision(),
        scale: store_type.scale(),
        exact_numeric: store_type.is_exact_numeric(),
        store_type: store_type.base,
        nullable: raw.nullable && !raw.primary_key,
        is_primary_key: raw.primary_key,
        foreign_key_targets,
        default: raw.default.clone(),
        srid,
        is_collection_valued: false,
    })
}

fn relation_column(relation: &RelationDescriptor) -> ColumnDescriptor {
    ColumnDescriptor {
        name: relation.name.clone(),
        header: None,
        logical_type: LogicalType::String,
        store_type: "RELATIONSHIP".to_string(),
        length: None,
        precision: None,
        scale: None,
        exact_numeric: false,
        nullable: true,
        is_primary_key: false,
        foreign_key_targets: relation.connected_foreign_keys.clone(),
        default: None,
        srid: None,
        is_collection_valued: true,
    }
}

impl SchemaDescriptor {
    /// Describe a table. Same as [`describe`].
    pub fn describe(metadata: &TableMetadata) -> Result<Self, SchemaError> {
        describe(metadata)
    }

    /// Schema the table lives in.
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// Table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// `schema.table`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.table_name)
    }

    /// Columns in declaration order, followed by relationship pseudo-columns.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Relationships to other tables.
    pub fn relationships(&self) -> &[RelationDescriptor] {
        &self.relationships
    }

    /// Look up a relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Primary key column names, sorted.
    pub fn primary_key_column_names(&self) -> &[String] {
        &self.primary_key_column_names
    }

    /// Geometry column names in declaration order.
    pub fn geometry_column_names(&self) -> &[String] {
        &self.geometry_column_names
    }

    /// The geometry column exposed by single-geometry formats.
    pub fn first_geometry_column(&self) -> Option<&ColumnDescriptor> {
        self.geometry_column_names
            .first()
            .and_then(|name| self.column(name))
    }
}

struct ColumnMap<'a>(&'a [ColumnDescriptor]);

impl Serialize for ColumnMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for column in self.0 {
            map.serialize_entry(&column.name, column)?;
        }
        map.end()
    }
}

struct RelationMap<'a>(&'a [RelationDescriptor]);

impl Serialize for RelationMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for relation in self.0 {
            map.serialize_entry(&relation.name, relation)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct DescriptorDocument<'a> {
    name: String,
    schema_name: &'a str,
    table_name: &'a str,
    primary_key_column_names: &'a [String],
    primary_key_column_count: usize,
    geometry_column_names: &'a [String],
    geometry_column_count: usize,
    column_count: usize,
    columns: ColumnMap<'a>,
    relationship_count: usize,
    relationships: RelationMap<'a>,
}

impl Serialize for SchemaDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DescriptorDocument {
            name: self.qualified_name(),
            schema_name: &self.schema_name,
            table_name: &self.table_name,
            primary_key_column_names: &self.primary_key_column_names,
            primary_key_column_count: self.primary_key_column_names.len(),
            geometry_column_names: &self.geometry_column_names,
            geometry_column_count: self.geometry_column_names.len(),
            column_count: self.columns.len(),
            columns: ColumnMap(&self.columns),
            relationship_count: self.relationships.len(),
            relationships: RelationMap(&self.relationships),
        }
        .serialize(serializer)
    }
}
