//! Read path benchmarks: filter compilation, execution and serialization.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo_types::{polygon, Geometry};
use georest_core::catalog::{describe, RawColumn, SchemaDescriptor, TableKey, TableMetadata};
use georest_core::geometry::GeoProvider;
use georest_core::query::{compile_filter, OrderDirection, QueryExecutor, ReadQuery, SortSpec};
use georest_core::render::serialize;
use georest_core::storage::{MemoryStore, Record, Store};
use georest_proto::{FilterNode, Format};
use rand::Rng;
use serde_json::json;

fn parcel() -> SchemaDescriptor {
    describe(
        &TableMetadata::new("cadastre", "parcel")
            .with_column(RawColumn::new("id", "INTEGER").primary_key())
            .with_column(RawColumn::new("area_m2", "FLOAT"))
            .with_column(RawColumn::new("status", "VARCHAR(1)"))
            .with_column(RawColumn::new("geom", "geometry(POLYGON,2056)")),
    )
    .unwrap()
}

fn generate_parcels(count: usize) -> Vec<Record> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|id| {
            let x: f64 = rng.gen_range(0.0..1000.0);
            let y: f64 = rng.gen_range(0.0..1000.0);
            let geom: Geometry<f64> = polygon![
                (x: x, y: y),
                (x: x + 10.0, y: y),
                (x: x + 10.0, y: y + 10.0),
                (x: x, y: y + 10.0),
                (x: x, y: y)
            ]
            .into();
            Record::new()
                .with_field("id", id as i64)
                .with_field("area_m2", rng.gen_range(10.0..500.0))
                .with_field("status", ["A", "B", "C"][id % 3])
                .with_field("geom", geom)
        })
        .collect()
}

fn filters() -> Vec<(&'static str, serde_json::Value)> {
    vec![
        ("compare", json!({"column_name": "area_m2", "operator": ">", "value": 100})),
        (
            "block",
            json!({"mode": "OR", "clauses": [
                {"column_name": "status", "operator": "IN", "value": "A,B"},
                {"column_name": "area_m2", "operator": "<=", "value": 50},
            ]}),
        ),
        (
            "collection",
            json!({
                "column_name": "geom",
                "operator": "INTERSECTS",
                "value": "MULTIPOINT((5 5),(250 250),(500 500))"
            }),
        ),
    ]
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_path/compile");
    let descriptor = parcel();

    for (name, filter) in filters() {
        let node = FilterNode::from_json(&filter).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| black_box(compile_filter(&descriptor, &node, &GeoProvider).unwrap()));
        });
    }

    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_path/execute");
    let descriptor = parcel();
    let key = TableKey::new("cadastre", "parcel");

    for size in [100, 1000, 10000] {
        let store = MemoryStore::new();
        store.extend(&key, generate_parcels(size));

        for (name, filter) in filters() {
            let node = FilterNode::from_json(&filter).unwrap();
            let query = ReadQuery::new()
                .with_predicate(compile_filter(&descriptor, &node, &GeoProvider).unwrap())
                .with_sort(Some(SortSpec::new("area_m2", OrderDirection::Desc)));

            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    let session = store.session().unwrap();
                    let records = QueryExecutor::new(&GeoProvider)
                        .execute(session.as_ref(), &descriptor, &query)
                        .unwrap();
                    session.rollback();
                    black_box(records)
                });
            });
        }
    }

    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_path/serialize");
    let descriptor = parcel();

    for size in [100, 1000] {
        let records = generate_parcels(size);
        for format in [Format::Json, Format::GeoJson, Format::Xml] {
            group.bench_with_input(
                BenchmarkId::new(format.to_string(), size),
                &records,
                |b, records| {
                    b.iter(|| black_box(serialize(records, &descriptor, format).unwrap()));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_execute, bench_serialize);
criterion_main!(benches);
