//! Integration tests for the read path: describe, compile, execute, serialize.

use georest_core::catalog::{describe, RawColumn, SchemaCache, SchemaDescriptor, TableMetadata};
use georest_core::geometry::{Dimension, GeoProvider};
use georest_core::query::{
    compile_filter, OrderDirection, Paging, Predicate, QueryExecutor, ReadQuery, SortSpec,
};
use georest_core::render::{decode_records, serialize};
use georest_core::storage::{Record, SledStore, StorageConfig, Store};
use georest_core::{Error, ErrorKind};
use georest_proto::{FilterNode, Format, Value};
use serde_json::{json, Value as Json};

struct TestContext {
    store: SledStore,
    cache: SchemaCache,
    provider: GeoProvider,
    _storage_dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let storage_dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(StorageConfig::new(storage_dir.path())).unwrap();

        Self {
            store,
            cache: SchemaCache::new(),
            provider: GeoProvider,
            _storage_dir: storage_dir,
        }
    }

    fn table(&self, metadata: &TableMetadata, rows: &[Json]) -> SchemaDescriptor {
        let descriptor = self.cache.get_or_describe(metadata).unwrap();
        for row in rows {
            self.store.insert_json(&descriptor, row).unwrap();
        }
        (*descriptor).clone()
    }

    fn read(&self, descriptor: &SchemaDescriptor, filter: Option<Json>) -> Result<Vec<Record>, Error> {
        let predicate = match filter {
            Some(filter) => {
                let node = FilterNode::from_json(&filter)?;
                compile_filter(descriptor, &node, &self.provider)?
            }
            None => None,
        };
        let query = ReadQuery::new()
            .with_predicate(predicate)
            .with_sort(Some(SortSpec::new("id", OrderDirection::Asc)));

        let session = self.store.session()?;
        let records = QueryExecutor::new(&self.provider).execute(session.as_ref(), descriptor, &query)?;
        session.commit()?;
        Ok(records)
    }
}

fn parcel() -> TableMetadata {
    TableMetadata::new("cadastre", "parcel")
        .with_column(RawColumn::new("id", "INTEGER").primary_key())
        .with_column(RawColumn::new("area_m2", "FLOAT"))
        .with_column(RawColumn::new("status", "VARCHAR(1)"))
        .with_column(RawColumn::new("surveyed", "DATE"))
        .with_column(RawColumn::new("geom", "geometry(POLYGON,2056)"))
}

fn parcel_rows() -> Vec<Json> {
    vec![
        json!({"id": 1, "area_m2": 50.0, "status": "A", "surveyed": "2019-01-02",
               "geom": "POLYGON((0 0,10 0,10 10,0 10,0 0))"}),
        json!({"id": 2, "area_m2": 150.0, "status": "B", "surveyed": "2020-03-04",
               "geom": "POLYGON((20 20,30 20,30 30,20 30,20 20))"}),
        json!({"id": 3, "area_m2": 100.0, "status": "C",
               "geom": "POLYGON((100 100,110 100,110 110,100 110,100 100))"}),
    ]
}

fn ids(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .filter_map(|r| r.get_field("id").as_i64())
        .collect()
}

#[test]
fn test_greater_than_selects_single_record() {
    let ctx = TestContext::new();
    let descriptor = ctx.table(&parcel(), &parcel_rows());

    let filter = json!({"column_name": "area_m2", "operator": ">", "value": 100});
    let records = ctx.read(&descriptor, Some(filter)).unwrap();

    assert_eq!(ids(&records), vec![2]);
    assert_eq!(records[0].get_field("area_m2"), &Value::Float(150.0));
}

#[test]
fn test_or_block_returns_union_once() {
    let ctx = TestContext::new();
    let descriptor = ctx.table(&parcel(), &parcel_rows());

    let filter = json!({"mode": "OR", "clauses": [
        {"column_name": "status", "operator": "=", "value": "A"},
        {"column_name": "status", "operator": "=", "value": "B"},
    ]});
    assert_eq!(ids(&ctx.read(&descriptor, Some(filter)).unwrap()), vec![1, 2]);

    // Overlapping branches still select each record once.
    let filter = json!({"mode": "OR", "clauses": [
        {"column_name": "area_m2", "operator": ">=", "value": 100},
        {"column_name": "status", "operator": "IN", "value": "B,C"},
    ]});
    assert_eq!(ids(&ctx.read(&descriptor, Some(filter)).unwrap()), vec![2, 3]);
}

#[test]
fn test_empty_block_matches_everything() {
    let ctx = TestContext::new();
    let descriptor = ctx.table(&parcel(), &parcel_rows());

    let all = ctx.read(&descriptor, None).unwrap();
    let empty = ctx
        .read(&descriptor, Some(json!({"mode": "AND", "clauses": []})))
        .unwrap();
    assert_eq!(ids(&all), ids(&empty));
    assert_eq!(all.len(), 3);
}

#[test]
fn test_single_child_block_equals_child() {
    let descriptor = describe(&parcel()).unwrap();
    let child = json!({"column_name": "status", "operator": "LIKE", "value": "A%"});
    let block = json!({"mode": "AND", "clauses": [child.clone()]});

    let compile = |filter: &Json| {
        let node = FilterNode::from_json(filter).unwrap();
        compile_filter(&descriptor, &node, &GeoProvider).unwrap()
    };
    assert_eq!(compile(&block), compile(&child));
}

#[test]
fn test_multipoint_against_polygon_column() {
    let ctx = TestContext::new();
    let descriptor = ctx.table(&parcel(), &parcel_rows());

    let filter = json!({
        "column_name": "geom",
        "operator": "INTERSECTS",
        "value": "MULTIPOINT((5 5),(25 25),(500 500))"
    });

    let node = FilterNode::from_json(&filter).unwrap();
    let predicate = compile_filter(&descriptor, &node, &GeoProvider).unwrap().unwrap();
    match &predicate {
        Predicate::Or(children) => {
            assert_eq!(children.len(), 3);
            let parts: Vec<Option<Dimension>> = children
                .iter()
                .map(|child| match child {
                    Predicate::Spatial(s) => s.value_part,
                    other => panic!("unexpected {:?}", other),
                })
                .collect();
            assert_eq!(
                parts,
                vec![
                    Some(Dimension::Point),
                    Some(Dimension::Line),
                    Some(Dimension::Polygon)
                ]
            );
        }
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(ids(&ctx.read(&descriptor, Some(filter)).unwrap()), vec![1, 2]);
}

#[test]
fn test_geometry_collection_column() {
    let ctx = TestContext::new();
    let metadata = TableMetadata::new("public", "feature")
        .with_column(RawColumn::new("id", "INTEGER").primary_key())
        .with_column(RawColumn::new("geom", "geometry(GEOMETRYCOLLECTION,2056)"));
    let descriptor = ctx.table(
        &metadata,
        &[
            json!({"id": 1, "geom": "GEOMETRYCOLLECTION(POINT(5 5),LINESTRING(50 50,60 60))"}),
            json!({"id": 2, "geom": "GEOMETRYCOLLECTION(POINT(70 70))"}),
        ],
    );

    let within = json!({
        "column_name": "geom",
        "operator": "WITHIN",
        "value": "POLYGON((0 0,10 0,10 10,0 10,0 0))"
    });
    assert_eq!(ids(&ctx.read(&descriptor, Some(within)).unwrap()), vec![1]);

    let both = json!({
        "column_name": "geom",
        "operator": "INTERSECTS",
        "value": "GEOMETRYCOLLECTION(LINESTRING(50 60,60 50))"
    });
    assert_eq!(ids(&ctx.read(&descriptor, Some(both)).unwrap()), vec![1]);
}

#[test]
fn test_paging_and_sort() {
    let ctx = TestContext::new();
    let descriptor = ctx.table(&parcel(), &parcel_rows());

    let query = ReadQuery::new()
        .with_sort(SortSpec::from_params(&descriptor, Some("area_m2"), Some("descending")).unwrap())
        .with_paging(Paging::from_params(Some("1"), Some("5")).unwrap());
    let session = ctx.store.session().unwrap();
    let records = QueryExecutor::new(&ctx.provider)
        .execute(session.as_ref(), &descriptor, &query)
        .unwrap();
    session.rollback();

    assert_eq!(ids(&records), vec![3, 1]);
}

#[test]
fn test_serialize_round_trip() {
    let ctx = TestContext::new();
    let descriptor = ctx.table(&parcel(), &parcel_rows());
    let records = ctx.read(&descriptor, None).unwrap();

    let bytes = serialize(&records, &descriptor, Format::Json).unwrap();
    let decoded = decode_records(&bytes, &descriptor).unwrap();

    assert_eq!(decoded.len(), records.len());
    for (original, decoded) in records.iter().zip(&decoded) {
        for column in ["id", "area_m2", "status", "surveyed"] {
            assert_eq!(original.get_field(column), decoded.get_field(column), "{}", column);
        }
    }
}

#[test]
fn test_geojson_output() {
    let ctx = TestContext::new();
    let descriptor = ctx.table(&parcel(), &parcel_rows());
    let records = ctx.read(&descriptor, None).unwrap();

    let bytes = serialize(&records, &descriptor, Format::GeoJson).unwrap();
    let doc: Json = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(doc["features"][0]["geometry"]["type"], json!("Polygon"));
    assert_eq!(doc["features"][0]["properties"]["surveyed"], json!("2019-01-02"));
    assert_eq!(doc["features"][2]["properties"]["surveyed"], Json::Null);
}

#[test]
fn test_client_errors_are_reported_before_execution() {
    let ctx = TestContext::new();
    let descriptor = ctx.table(&parcel(), &parcel_rows());

    let cases = [
        json!({"column_name": "status", "operator": "MATCHES", "value": "A"}),
        json!({"column_name": "status", "operator": "="}),
        json!({"mode": "NAND", "clauses": [
            {"column_name": "status", "operator": "NULL"},
            {"column_name": "status", "operator": "NOT_NULL"},
        ]}),
        json!({"column_name": "geom", "operator": "WITHIN", "value": "SRID=4326;POINT(1 1)"}),
        json!({"operator": "=", "value": 1}),
    ];

    for filter in cases {
        let err = ctx.read(&descriptor, Some(filter.clone())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Client, "{} -> {:?}", filter, err);
    }
}

#[test]
fn test_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let descriptor = describe(&parcel()).unwrap();

    {
        let store = SledStore::open(StorageConfig::new(dir.path())).unwrap();
        for row in parcel_rows() {
            store.insert_json(&descriptor, &row).unwrap();
        }
        store.flush().unwrap();
    }

    let store = SledStore::open(StorageConfig::new(dir.path())).unwrap();
    let session = store.session().unwrap();
    assert_eq!(session.scan(&descriptor).unwrap().len(), 3);
}
