//! Schema descriptor cache.
//!
//! One immutable descriptor per table, built on first use. Concurrent first
//! uses may both build a descriptor; the first one inserted wins and the
//! others adopt it. No lock is held while describing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::descriptor::{describe, SchemaDescriptor};
use super::metadata::TableMetadata;
use crate::error::SchemaError;

/// Identity of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    /// Schema name.
    pub schema: String,
    /// Table name.
    pub table: String,
}

impl TableKey {
    /// Create a table key.
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Key of the table the metadata describes.
    pub fn of(metadata: &TableMetadata) -> Self {
        Self::new(metadata.schema.clone(), metadata.name.clone())
    }
}

/// Cache hit statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to describe the table.
    pub misses: u64,
    /// Cached descriptors.
    pub entries: usize,
}

/// Cache of schema descriptors, keyed by table.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: DashMap<TableKey, Arc<SchemaDescriptor>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SchemaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the descriptor of a table, describing it on first use.
    pub fn get_or_describe(
        &self,
        metadata: &TableMetadata,
    ) -> Result<Arc<SchemaDescriptor>, SchemaError> {
        let key = TableKey::of(metadata);
        if let Some(descriptor) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(descriptor);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let built = Arc::new(describe(metadata)?);
        let entry = self.entries.entry(key).or_insert(built);
        debug!(table = %entry.qualified_name(), "cached schema descriptor");
        Ok(Arc::clone(entry.value()))
    }

    /// Get a cached descriptor.
    pub fn get(&self, key: &TableKey) -> Option<Arc<SchemaDescriptor>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop the cached descriptor of a table.
    pub fn invalidate(&self, key: &TableKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::metadata::RawColumn;
    use std::thread;

    fn metadata() -> TableMetadata {
        TableMetadata::new("public", "road")
            .with_column(RawColumn::new("id", "INTEGER").primary_key())
            .with_column(RawColumn::new("geom", "geometry(LINESTRING,2056)"))
    }

    #[test]
    fn test_describes_once() {
        let cache = SchemaCache::new();
        let first = cache.get_or_describe(&metadata()).unwrap();
        let second = cache.get_or_describe(&metadata()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn test_invalidate() {
        let cache = SchemaCache::new();
        cache.get_or_describe(&metadata()).unwrap();

        let key = TableKey::new("public", "road");
        assert!(cache.get(&key).is_some());
        assert!(cache.invalidate(&key));
        assert!(cache.is_empty());
        assert!(!cache.invalidate(&key));
    }

    #[test]
    fn test_concurrent_first_use_agrees() {
        let cache = Arc::new(SchemaCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_describe(&metadata()).unwrap())
            })
            .collect();

        let descriptors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let cached = cache.get(&TableKey::new("public", "road")).unwrap();
        for descriptor in &descriptors {
            assert!(Arc::ptr_eq(descriptor, &cached));
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_schema_errors_are_not_cached() {
        let cache = SchemaCache::new();
        let bad = TableMetadata::new("public", "bad")
            .with_column(RawColumn::new("geom", "geometry(POINT)"));

        assert!(cache.get_or_describe(&bad).is_err());
        assert!(cache.is_empty());
    }
}
