//! Table catalog.
//!
//! Reflects raw table metadata into [`SchemaDescriptor`]s and caches them
//! per table.

mod cache;
mod column;
mod descriptor;
mod metadata;
mod relation;
mod types;

pub use cache::{CacheStats, SchemaCache, TableKey};
pub use column::ColumnDescriptor;
pub use descriptor::{describe, SchemaDescriptor};
pub use metadata::{Cardinality, RawColumn, RawForeignKey, RawRelationship, TableMetadata};
pub use relation::RelationDescriptor;
pub use types::{GeometryKind, LogicalType, StoreType};
