//! georest core - schema descriptors, filter compilation, query execution
//! and record serialization.
//!
//! The read path for one request is:
//!
//! 1. [`describe`] the table (usually through a [`SchemaCache`]),
//! 2. [`compile_filter`] the request's filter tree into a [`Predicate`],
//! 3. run a [`ReadQuery`] with the [`QueryExecutor`] inside a store
//!    [`Session`],
//! 4. [`serialize`] the records in the requested [`Format`].

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod catalog;
pub mod error;
pub mod geometry;
pub mod query;
pub mod render;
pub mod storage;

pub use catalog::{
    describe, Cardinality, ColumnDescriptor, GeometryKind, LogicalType, RawColumn, RawForeignKey,
    RawRelationship, SchemaCache, SchemaDescriptor, TableKey, TableMetadata,
};
pub use error::{Error, ErrorKind, SchemaError};
pub use geometry::{Dimension, GeoProvider, GeometryProvider, SpatialOp};
pub use query::{
    compile_filter, OrderDirection, Paging, Predicate, PredicateEvaluator, QueryExecutor,
    ReadQuery, SortSpec, SqlRenderer,
};
pub use render::{serialize, serialize_count, serialize_model, serialize_to, CancelToken};
pub use storage::{MemoryStore, Record, Session, SledStore, StorageConfig, Store};

/// Re-export protocol types.
pub use georest_proto as proto;
pub use georest_proto::{FilterNode, Format, Value};
