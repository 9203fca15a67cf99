//! In-memory store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Record, Session, Store};
use crate::catalog::{SchemaDescriptor, TableKey};
use crate::error::Error;

/// Store keeping every table in memory.
///
/// Sessions take a snapshot of the table map when opened; inserts made
/// afterwards are not visible to them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<TableKey, Arc<Vec<Record>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to a table.
    pub fn insert(&self, key: &TableKey, record: Record) {
        let mut tables = self.tables.write();
        let rows = tables.entry(key.clone()).or_default();
        Arc::make_mut(rows).push(record);
    }

    /// Append several records to a table.
    pub fn extend(&self, key: &TableKey, records: impl IntoIterator<Item = Record>) {
        let mut tables = self.tables.write();
        let rows = tables.entry(key.clone()).or_default();
        Arc::make_mut(rows).extend(records);
    }

    /// Number of records in a table.
    pub fn len(&self, key: &TableKey) -> usize {
        self.tables.read().get(key).map(|rows| rows.len()).unwrap_or(0)
    }
}

impl Store for MemoryStore {
    fn session(&self) -> Result<Box<dyn Session + '_>, Error> {
        let snapshot = self.tables.read().clone();
        Ok(Box::new(MemorySession { snapshot }))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

struct MemorySession {
    snapshot: HashMap<TableKey, Arc<Vec<Record>>>,
}

impl Session for MemorySession {
    fn scan(&self, descriptor: &SchemaDescriptor) -> Result<Vec<Record>, Error> {
        let key = TableKey::new(descriptor.schema_name(), descriptor.table_name());
        Ok(self
            .snapshot
            .get(&key)
            .map(|rows| rows.as_ref().clone())
            .unwrap_or_default())
    }

    fn commit(self: Box<Self>) -> Result<(), Error> {
        Ok(())
    }

    fn rollback(self: Box<Self>) {}
}
