//! Registry of the tables served by the gateway.

use std::collections::HashMap;
use std::sync::Arc;

use georest_core::catalog::{SchemaCache, SchemaDescriptor, TableKey, TableMetadata};
use georest_core::storage::SledStore;
use georest_core::{Error, SchemaError};
use tracing::info;

use crate::config::TableDefinition;

/// Table metadata by table, with the descriptor cache built from it.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: HashMap<TableKey, TableMetadata>,
    cache: SchemaCache,
}

impl TableRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from table definitions.
    pub fn from_definitions(definitions: &[TableDefinition]) -> Self {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(definition.metadata.clone());
        }
        registry
    }

    /// Serve a table. A table registered twice keeps the last metadata.
    pub fn register(&mut self, metadata: TableMetadata) {
        let key = TableKey::of(&metadata);
        self.cache.invalidate(&key);
        self.tables.insert(key, metadata);
    }

    /// Describe every registered table.
    ///
    /// Run at startup so that unusable metadata stops the service before it
    /// accepts requests.
    pub fn describe_all(&self) -> Result<usize, SchemaError> {
        for metadata in self.tables.values() {
            let descriptor = self.cache.get_or_describe(metadata)?;
            info!(
                table = %descriptor.qualified_name(),
                columns = descriptor.columns().len(),
                geometry_columns = descriptor.geometry_column_names().len(),
                "described table"
            );
        }
        Ok(self.tables.len())
    }

    /// Descriptor of a served table.
    pub fn descriptor(&self, schema: &str, table: &str) -> Result<Arc<SchemaDescriptor>, Error> {
        let key = TableKey::new(schema, table);
        let metadata = self.tables.get(&key).ok_or_else(|| Error::UnknownTable {
            schema: schema.to_string(),
            table: table.to_string(),
        })?;
        Ok(self.cache.get_or_describe(metadata)?)
    }

    /// Write seed rows into tables that are still empty.
    ///
    /// Returns the number of rows written.
    pub fn seed(&self, store: &SledStore, definitions: &[TableDefinition]) -> Result<usize, Error> {
        let mut written = 0;
        for definition in definitions.iter().filter(|d| !d.rows.is_empty()) {
            let descriptor = self.cache.get_or_describe(&definition.metadata)?;
            if store.len(&descriptor)? > 0 {
                continue;
            }
            for row in &definition.rows {
                store.insert_json(&descriptor, row)?;
            }
            written += definition.rows.len();
            info!(
                table = %descriptor.qualified_name(),
                rows = definition.rows.len(),
                "seeded table"
            );
        }
        Ok(written)
    }

    /// Number of served tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if no table is served.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
