//! Raw table metadata as reported by a store.
//!
//! This is the input to [`describe`](super::describe). It is loaded from
//! configuration or built in code; nothing outside the catalog reads it.

use serde::{Deserialize, Serialize};

/// Metadata of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Schema (namespace) the table lives in.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<RawColumn>,
    /// Relationships to other tables.
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

/// Metadata of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    /// Column name.
    pub name: String,
    /// Store type text, e.g. `VARCHAR(100)` or `geometry(POLYGON,2056)`.
    #[serde(rename = "type", default)]
    pub type_name: String,
    /// Whether the column accepts null.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Foreign key references.
    #[serde(default)]
    pub foreign_keys: Vec<RawForeignKey>,
    /// Server-side default.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Coordinate reference system of a geometry column.
    #[serde(default)]
    pub srid: Option<i32>,
    /// Human-readable label.
    #[serde(default)]
    pub header: Option<String>,
}

fn default_nullable() -> bool {
    true
}

/// A foreign key reference, as a path string or as parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawForeignKey {
    /// `schema.table.column`, `table.column` or with `:` separators.
    Path(String),
    /// Separate parts.
    Parts {
        #[serde(default)]
        schema: Option<String>,
        #[serde(default)]
        table: Option<String>,
        #[serde(default)]
        column: Option<String>,
    },
}

/// Cardinality of a relationship, seen from the described table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// At most one related record on each side.
    OneToOne,
    /// This record is referenced by many.
    OneToMany,
    /// Many records reference one.
    ManyToOne,
    /// Linked through an association table.
    ManyToMany,
}

/// Metadata of one relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRelationship {
    /// Relationship name, unique among the table's columns.
    pub name: String,
    /// Table on the far side.
    pub target_table: String,
    /// Relationship cardinality.
    pub cardinality: Cardinality,
    /// Foreign key columns that connect the two tables.
    #[serde(default)]
    pub foreign_keys: Vec<String>,
}

impl TableMetadata {
    /// Create metadata for an empty table.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Add a column.
    pub fn with_column(mut self, column: RawColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a relationship.
    pub fn with_relationship(mut self, relationship: RawRelationship) -> Self {
        self.relationships.push(relationship);
        self
    }
}

impl RawColumn {
    /// Create a nullable column.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
            primary_key: false,
            foreign_keys: Vec::new(),
            default: None,
            srid: None,
            header: None,
        }
    }

    /// Mark as a primary key column (implies not null).
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Mark as not null.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Add a foreign key reference.
    pub fn with_foreign_key(mut self, reference: RawForeignKey) -> Self {
        self.foreign_keys.push(reference);
        self
    }

    /// Set the server-side default.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Set the coordinate reference system.
    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid);
        self
    }

    /// Set the human-readable label.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }
}

impl RawForeignKey {
    /// Reference given as a path string.
    pub fn path(path: impl Into<String>) -> Self {
        RawForeignKey::Path(path.into())
    }

    /// Resolve into a `schema.table.column` (or `table.column`) path.
    ///
    /// Returns `None` when the table or column part is missing.
    pub fn resolve(&self) -> Option<String> {
        let parts: Vec<&str> = match self {
            RawForeignKey::Path(path) => path
                .split(['.', ':'])
                .map(str::trim)
                .collect(),
            RawForeignKey::Parts {
                schema,
                table,
                column,
            } => {
                let mut parts = Vec::with_capacity(3);
                if let Some(schema) = schema.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    parts.push(schema);
                }
                parts.push(table.as_deref().map(str::trim).unwrap_or(""));
                parts.push(column.as_deref().map(str::trim).unwrap_or(""));
                parts
            }
        };

        if !(2..=3).contains(&parts.len()) || parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        Some(parts.join("."))
    }

    /// Text of the reference as given, for error messages.
    pub fn describe(&self) -> String {
        match self {
            RawForeignKey::Path(path) => format!("'{}'", path),
            RawForeignKey::Parts {
                schema,
                table,
                column,
            } => format!(
                "schema={} table={} column={}",
                schema.as_deref().unwrap_or("-"),
                table.as_deref().unwrap_or("-"),
                column.as_deref().unwrap_or("-")
            ),
        }
    }
}

impl RawRelationship {
    /// Create a relationship.
    pub fn new(
        name: impl Into<String>,
        target_table: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            name: name.into(),
            target_table: target_table.into(),
            cardinality,
            foreign_keys: Vec::new(),
        }
    }

    /// Add a connecting foreign key column.
    pub fn with_foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_keys.push(column.into());
        self
    }
}

impl Cardinality {
    /// Check if the far side holds many records.
    pub fn is_collection_valued(&self) -> bool {
        matches!(self, Cardinality::OneToMany | Cardinality::ManyToMany)
    }
}
