//! Sled-backed store.
//!
//! Each table lives in its own tree named `table:<schema>.<table>`. Rows are
//! JSON objects keyed by their encoded primary key; geometries are stored as
//! WKT and decimals as strings. Decoding is directed by the table's
//! descriptor.

use std::sync::Arc;

use serde_json::{Map, Value as Json};
use sled::{Db, Tree};
use tracing::debug;

use super::{Record, Session, StorageConfig, Store};
use crate::catalog::SchemaDescriptor;
use crate::error::Error;
use crate::geometry::{GeoProvider, GeometryProvider};
use crate::query::value_codec::{decode_stored, encode_stored};

/// Prefix of per-table tree names.
const TABLE_TREE_PREFIX: &str = "table:";

/// Store persisting tables in sled.
pub struct SledStore {
    db: Db,
    provider: Arc<dyn GeometryProvider>,
}

impl SledStore {
    /// Open or create a store with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        Ok(Self {
            db,
            provider: Arc::new(GeoProvider),
        })
    }

    /// Wrap an already opened database.
    pub fn from_db(db: Db) -> Self {
        Self {
            db,
            provider: Arc::new(GeoProvider),
        }
    }

    /// Use a different geometry provider for WKT encoding.
    pub fn with_provider(mut self, provider: Arc<dyn GeometryProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Check if the database was recovered from a previous run.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// Write a record, replacing any record with the same primary key.
    pub fn insert(&self, descriptor: &SchemaDescriptor, record: &Record) -> Result<(), Error> {
        let tree = self.tree(descriptor)?;
        let key = self.record_key(descriptor, record)?;

        let mut row = Map::new();
        for column in descriptor.columns() {
            let value = record.get_field(&column.name);
            row.insert(column.name.clone(), encode_stored(value, self.provider.as_ref()));
        }
        let bytes = serde_json::to_vec(&Json::Object(row))
            .map_err(|e| Error::Serialization(e.to_string()))?;

        tree.insert(key, bytes)?;
        Ok(())
    }

    /// Write a row given as a JSON object.
    ///
    /// Geometry fields are WKT text. Fields the table does not declare are
    /// rejected.
    pub fn insert_json(&self, descriptor: &SchemaDescriptor, row: &Json) -> Result<(), Error> {
        let object = row.as_object().ok_or_else(|| Error::InvalidValue {
            column: descriptor.qualified_name(),
            value: row.to_string(),
            reason: "expected an object".to_string(),
        })?;

        let mut record = Record::new();
        for (name, json) in object {
            let column = descriptor
                .column(name)
                .ok_or_else(|| Error::UnknownColumn {
                    table: descriptor.qualified_name(),
                    column: name.clone(),
                })?;
            let value = decode_stored(column, json, self.provider.as_ref()).map_err(|reason| {
                Error::InvalidValue {
                    column: name.clone(),
                    value: json.to_string(),
                    reason,
                }
            })?;
            record.set(name.clone(), value);
        }

        self.insert(descriptor, &record)
    }

    /// Number of stored rows of a table.
    pub fn len(&self, descriptor: &SchemaDescriptor) -> Result<usize, Error> {
        Ok(self.tree(descriptor)?.len())
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    fn tree(&self, descriptor: &SchemaDescriptor) -> Result<Tree, Error> {
        Ok(self.db.open_tree(tree_name(descriptor))?)
    }

    fn record_key(&self, descriptor: &SchemaDescriptor, record: &Record) -> Result<Vec<u8>, Error> {
        if descriptor.primary_key_column_names().is_empty() {
            return Ok(self.db.generate_id()?.to_be_bytes().to_vec());
        }
        let key: Vec<Json> = record
            .primary_key(descriptor)
            .iter()
            .map(|value| encode_stored(value, self.provider.as_ref()))
            .collect();
        serde_json::to_vec(&key).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl Store for SledStore {
    fn session(&self) -> Result<Box<dyn Session + '_>, Error> {
        Ok(Box::new(SledSession { store: self }))
    }

    fn backend(&self) -> &'static str {
        "sled"
    }
}

/// Read session over a sled database.
///
/// Sled iterators observe writes that complete while they run; each scan is
/// consistent per key, not across the whole table.
struct SledSession<'a> {
    store: &'a SledStore,
}

impl Session for SledSession<'_> {
    fn scan(&self, descriptor: &SchemaDescriptor) -> Result<Vec<Record>, Error> {
        let tree = self.store.tree(descriptor)?;
        let provider = self.store.provider.as_ref();
        let mut records = Vec::with_capacity(tree.len());

        for entry in tree.iter() {
            let (_, bytes) = entry?;
            let row: Map<String, Json> = serde_json::from_slice(&bytes)
                .map_err(|e| Error::Deserialization(e.to_string()))?;

            let mut record = Record::new();
            for column in descriptor.columns() {
                let json = row.get(&column.name).unwrap_or(&Json::Null);
                let value = decode_stored(column, json, provider).map_err(|reason| {
                    Error::Deserialization(format!(
                        "{}.{}: {}",
                        descriptor.qualified_name(),
                        column.name,
                        reason
                    ))
                })?;
                record.set(column.name.clone(), value);
            }
            records.push(record);
        }

        debug!(table = %descriptor.qualified_name(), rows = records.len(), "scanned table");
        Ok(records)
    }

    fn commit(self: Box<Self>) -> Result<(), Error> {
        Ok(())
    }

    fn rollback(self: Box<Self>) {}
}

fn tree_name(descriptor: &SchemaDescriptor) -> String {
    format!("{}{}", TABLE_TREE_PREFIX, descriptor.qualified_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{describe, RawColumn, TableMetadata};
    use georest_proto::Value;
    use serde_json::json;

    fn descriptor() -> SchemaDescriptor {
        describe(
            &TableMetadata::new("public", "poi")
                .with_column(RawColumn::new("id", "INTEGER").primary_key())
                .with_column(RawColumn::new("name", "TEXT"))
                .with_column(RawColumn::new("geom", "geometry(POINT,2056)")),
        )
        .unwrap()
    }

    #[test]
    fn test_insert_and_scan() {
        let store = SledStore::open(StorageConfig::temporary()).unwrap();
        let descriptor = descriptor();

        store
            .insert_json(&descriptor, &json!({"id": 1, "name": "a", "geom": "POINT(1 2)"}))
            .unwrap();
        store.insert_json(&descriptor, &json!({"id": 2})).unwrap();

        let session = store.session().unwrap();
        let records = session.scan(&descriptor).unwrap();
        session.commit().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_field("name"), &Value::String("a".into()));
        assert!(matches!(records[0].get_field("geom"), Value::Geometry(_)));
        assert_eq!(records[1].get_field("geom"), &Value::Null);
    }

    #[test]
    fn test_same_key_replaces() {
        let store = SledStore::open(StorageConfig::temporary()).unwrap();
        let descriptor = descriptor();

        store.insert_json(&descriptor, &json!({"id": 1, "name": "a"})).unwrap();
        store.insert_json(&descriptor, &json!({"id": 1, "name": "b"})).unwrap();

        assert_eq!(store.len(&descriptor).unwrap(), 1);
    }

    #[test]
    fn test_rejects_bad_rows() {
        let store = SledStore::open(StorageConfig::temporary()).unwrap();
        let descriptor = descriptor();

        assert!(matches!(
            store.insert_json(&descriptor, &json!({"nope": 1})),
            Err(Error::UnknownColumn { .. })
        ));
        assert!(matches!(
            store.insert_json(&descriptor, &json!({"id": 1, "geom": "POINT("})),
            Err(Error::InvalidValue { .. })
        ));
        assert!(store.insert_json(&descriptor, &json!([1])).is_err());
    }
}
