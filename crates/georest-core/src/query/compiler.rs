//! Filter compiler.
//!
//! Translates a [`FilterNode`] tree into a [`Predicate`]. Blocks combine
//! their compiled children; clauses dispatch on whether the referenced column
//! holds geometries.
//!
//! Scalar operators come from an [`OperatorTable`]. The standard table can be
//! extended with [`OperatorTable::with_operator`] without touching the
//! built-in entries.
//!
//! Spatial clauses are first classified by whether the stored column and the
//! supplied value are multi-part, see [`GeometryCase`].

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use georest_proto::{Block, Clause, FilterNode, Value};
use serde_json::Value as Json;
use tracing::{debug, instrument};

use super::predicate::{CompareOp, Predicate, SpatialPredicate};
use super::value_codec::{coerce, coerce_text};
use crate::catalog::{ColumnDescriptor, SchemaDescriptor};
use crate::error::{Error, SchemaError};
use crate::geometry::{Dimension, GeometryProvider, SpatialOp};

/// Text marking a geometry collection, in column types and WKT values.
const COLLECTION_TAG: &str = "GEOMETRYCOLLECTION";

/// WKT tags of multi-part geometries other than collections.
const MULTI_TAGS: [&str; 3] = ["MULTIPOINT", "MULTILINESTRING", "MULTIPOLYGON"];

/// Compile a filter tree against a table with the standard operators.
///
/// Returns `None` when the tree contains no clause.
pub fn compile_filter(
    descriptor: &SchemaDescriptor,
    node: &FilterNode,
    provider: &dyn GeometryProvider,
) -> Result<Option<Predicate>, Error> {
    FilterCompiler::new(descriptor, provider).compile(node)
}

/// A scalar clause operator.
pub trait ClauseOperator: Send + Sync {
    /// Whether the clause must carry a value.
    fn needs_value(&self) -> bool {
        true
    }

    /// Build the predicate for a clause on `column`.
    ///
    /// `value` is present whenever [`needs_value`](Self::needs_value) holds.
    fn compile(&self, column: &ColumnDescriptor, value: Option<&Json>) -> Result<Predicate, Error>;
}

/// Operators applicable to non-geometry columns, by clause spelling.
#[derive(Clone)]
pub struct OperatorTable {
    operators: HashMap<String, Arc<dyn ClauseOperator>>,
}

impl OperatorTable {
    /// Comparison, `LIKE`, `IN`, `NULL` and `NOT_NULL`.
    pub fn standard() -> Self {
        let mut table = Self {
            operators: HashMap::new(),
        };
        for spelling in ["=", "==", "<>", "!=", "<", "<=", ">", ">="] {
            if let Some(op) = CompareOp::from_operator(spelling) {
                table = table.with_operator(spelling, Comparison(op));
            }
        }
        table
            .with_operator("LIKE", LikeOperator)
            .with_operator("IN", InOperator)
            .with_operator("NULL", NullOperator)
            .with_operator("NOT_NULL", NotNullOperator)
    }

    /// Shared instance of the standard table.
    pub fn shared() -> &'static OperatorTable {
        static STANDARD: OnceLock<OperatorTable> = OnceLock::new();
        STANDARD.get_or_init(OperatorTable::standard)
    }

    /// Add or override an operator.
    pub fn with_operator(
        mut self,
        spelling: impl Into<String>,
        operator: impl ClauseOperator + 'static,
    ) -> Self {
        self.operators.insert(spelling.into(), Arc::new(operator));
        self
    }

    /// Look up an operator.
    pub fn get(&self, spelling: &str) -> Option<&dyn ClauseOperator> {
        self.operators.get(spelling).map(|op| op.as_ref())
    }

    /// Known spellings, sorted.
    pub fn spellings(&self) -> Vec<&str> {
        let mut spellings: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        spellings.sort_unstable();
        spellings
    }
}

/// Which sides of a spatial clause are multi-part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryCase {
    /// Plain column, plain value: one direct comparison.
    Direct,
    /// Collection column, plain value: stored side split by dimension.
    StoredCollection,
    /// Plain column, multi-part value: supplied side split by dimension.
    SuppliedCollection,
    /// Both sides multi-part: same-dimension parts compared pairwise.
    BothCollections,
}

impl GeometryCase {
    /// Number of leaf comparisons the case compiles to.
    pub fn comparisons(&self) -> usize {
        match self {
            GeometryCase::Direct => 1,
            _ => Dimension::ALL.len(),
        }
    }
}

/// Classify a spatial clause on `column` with the WKT `value`.
///
/// The stored side is multi-part when the column is declared as a geometry
/// collection; the supplied side when the WKT names a collection or a
/// multi-part type.
pub fn classify(column: &ColumnDescriptor, value: &str) -> Result<GeometryCase, Error> {
    if column.geometry_kind().is_none() {
        return Err(Error::UnclassifiedGeometryComparison {
            column: column.name.clone(),
        });
    }

    let stored = column.is_geometry_collection();
    let supplied = is_multi_part(value);

    let case = match (stored, supplied) {
        (false, false) => GeometryCase::Direct,
        (true, false) => GeometryCase::StoredCollection,
        (false, true) => GeometryCase::SuppliedCollection,
        (true, true) => GeometryCase::BothCollections,
    };
    Ok(case)
}

fn is_multi_part(wkt: &str) -> bool {
    let upper = wkt.to_ascii_uppercase();
    if upper.contains(COLLECTION_TAG) {
        return true;
    }
    let body = match upper.split_once(';') {
        Some((prefix, body)) if prefix.trim_start().starts_with("SRID=") => body,
        _ => upper.as_str(),
    };
    let body = body.trim_start();
    MULTI_TAGS.iter().any(|tag| body.starts_with(tag))
}

/// Compiles filter trees for one table.
pub struct FilterCompiler<'a> {
    descriptor: &'a SchemaDescriptor,
    provider: &'a dyn GeometryProvider,
    operators: &'a OperatorTable,
}

impl<'a> FilterCompiler<'a> {
    /// Create a compiler using the standard operators.
    pub fn new(descriptor: &'a SchemaDescriptor, provider: &'a dyn GeometryProvider) -> Self {
        Self {
            descriptor,
            provider,
            operators: OperatorTable::shared(),
        }
    }

    /// Use a custom operator table.
    pub fn with_operators(mut self, operators: &'a OperatorTable) -> Self {
        self.operators = operators;
        self
    }

    /// Compile a filter tree.
    #[instrument(skip_all, fields(table = %self.descriptor.qualified_name()))]
    pub fn compile(&self, node: &FilterNode) -> Result<Option<Predicate>, Error> {
        let predicate = self.compile_node(node)?;
        debug!(
            leaves = predicate.as_ref().map(Predicate::leaf_count).unwrap_or(0),
            "compiled filter"
        );
        Ok(predicate)
    }

    fn compile_node(&self, node: &FilterNode) -> Result<Option<Predicate>, Error> {
        match node {
            FilterNode::Block(block) => self.compile_block(block),
            FilterNode::Clause(clause) => self.compile_clause(clause).map(Some),
        }
    }

    fn compile_block(&self, block: &Block) -> Result<Option<Predicate>, Error> {
        let mut children = Vec::with_capacity(block.children.len());
        for child in &block.children {
            if let Some(predicate) = self.compile_node(child)? {
                children.push(predicate);
            }
        }

        if children.len() < 2 {
            return Ok(children.pop());
        }

        match block.mode.as_str() {
            "AND" => Ok(Some(Predicate::And(children))),
            "OR" => Ok(Some(Predicate::Or(children))),
            other => Err(Error::UnsupportedMode(other.to_string())),
        }
    }

    fn compile_clause(&self, clause: &Clause) -> Result<Predicate, Error> {
        let column = self
            .descriptor
            .column(&clause.column_name)
            .ok_or_else(|| Error::UnknownColumn {
                table: self.descriptor.qualified_name(),
                column: clause.column_name.clone(),
            })?;

        if column.is_collection_valued {
            return Err(unsupported(clause));
        }

        if column.is_geometry() {
            return self.compile_spatial(column, clause);
        }

        let operator = self
            .operators
            .get(&clause.operator)
            .ok_or_else(|| unsupported(clause))?;

        let value = clause.value.as_ref().filter(|v| !v.is_null());
        if operator.needs_value() && value.is_none() {
            return Err(missing_value(clause));
        }
        operator.compile(column, value)
    }

    fn compile_spatial(&self, column: &ColumnDescriptor, clause: &Clause) -> Result<Predicate, Error> {
        let op = SpatialOp::from_operator(&clause.operator).ok_or_else(|| unsupported(clause))?;

        let text = match clause.value.as_ref() {
            None | Some(Json::Null) => return Err(missing_value(clause)),
            Some(Json::String(text)) => text,
            Some(_) => {
                return Err(Error::InvalidGeometry {
                    column: column.name.clone(),
                    reason: "expected WKT text".to_string(),
                })
            }
        };

        let srid = column.srid.ok_or_else(|| {
            Error::Schema(SchemaError::MissingSrid {
                table: self.descriptor.qualified_name(),
                column: column.name.clone(),
            })
        })?;

        let parsed = self
            .provider
            .parse_wkt(text)
            .map_err(|e| Error::InvalidGeometry {
                column: column.name.clone(),
                reason: e.to_string(),
            })?;
        if let Some(actual) = parsed.srid {
            if actual != srid {
                return Err(Error::SridMismatch {
                    column: column.name.clone(),
                    expected: srid,
                    actual,
                });
            }
        }

        let case = classify(column, text)?;
        let wkt = self.provider.to_wkt(&parsed.geometry);
        let spatial = |stored_part: Option<Dimension>, value_part: Option<Dimension>| {
            let geometry = match value_part {
                Some(dimension) => self.provider.collection_extract(&parsed.geometry, dimension),
                None => parsed.geometry.clone(),
            };
            Predicate::Spatial(SpatialPredicate {
                op,
                column: column.name.clone(),
                srid,
                stored_part,
                value_part,
                geometry,
                wkt: wkt.clone(),
            })
        };

        let predicate = match case {
            GeometryCase::Direct => spatial(None, None),
            GeometryCase::StoredCollection => {
                Predicate::Or(Dimension::ALL.iter().map(|d| spatial(Some(*d), None)).collect())
            }
            GeometryCase::SuppliedCollection => {
                Predicate::Or(Dimension::ALL.iter().map(|d| spatial(None, Some(*d))).collect())
            }
            GeometryCase::BothCollections => Predicate::Or(
                Dimension::ALL
                    .iter()
                    .map(|d| spatial(Some(*d), Some(*d)))
                    .collect(),
            ),
        };

        debug!(column = %column.name, op = %op, case = ?case, "compiled spatial clause");
        Ok(predicate)
    }
}

fn unsupported(clause: &Clause) -> Error {
    Error::UnsupportedOperator {
        operator: clause.operator.clone(),
        column: clause.column_name.clone(),
    }
}

fn missing_value(clause: &Clause) -> Error {
    Error::MissingValue {
        column: clause.column_name.clone(),
        operator: clause.operator.clone(),
    }
}

fn invalid_value(column: &ColumnDescriptor, value: impl ToString, reason: String) -> Error {
    Error::InvalidValue {
        column: column.name.clone(),
        value: value.to_string(),
        reason,
    }
}

fn required(column: &ColumnDescriptor, value: Option<&Json>) -> Result<Json, Error> {
    value.cloned().ok_or_else(|| Error::MissingValue {
        column: column.name.clone(),
        operator: String::new(),
    })
}

fn clause_text(json: &Json) -> Option<String> {
    match json {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `=`, `<>`, `<`, `<=`, `>`, `>=` and their synonyms.
pub struct Comparison(pub CompareOp);

impl ClauseOperator for Comparison {
    fn compile(&self, column: &ColumnDescriptor, value: Option<&Json>) -> Result<Predicate, Error> {
        let json = required(column, value)?;
        let value = coerce(column, &json).map_err(|reason| invalid_value(column, &json, reason))?;
        Ok(Predicate::Compare {
            column: column.name.clone(),
            op: self.0,
            value,
        })
    }
}

/// Pattern match on the column's text.
pub struct LikeOperator;

impl ClauseOperator for LikeOperator {
    fn compile(&self, column: &ColumnDescriptor, value: Option<&Json>) -> Result<Predicate, Error> {
        let json = required(column, value)?;
        let pattern = clause_text(&json)
            .ok_or_else(|| invalid_value(column, &json, "expected a pattern".to_string()))?;
        Ok(Predicate::Like {
            column: column.name.clone(),
            pattern,
        })
    }
}

/// Membership in a comma separated list.
///
/// Members cannot contain a comma.
pub struct InOperator;

impl ClauseOperator for InOperator {
    fn compile(&self, column: &ColumnDescriptor, value: Option<&Json>) -> Result<Predicate, Error> {
        let json = required(column, value)?;
        let text = clause_text(&json).ok_or_else(|| {
            invalid_value(column, &json, "expected comma separated values".to_string())
        })?;

        let values = text
            .split(',')
            .map(|member| {
                coerce_text(column, member).map_err(|reason| invalid_value(column, member, reason))
            })
            .collect::<Result<Vec<Value>, Error>>()?;

        Ok(Predicate::In {
            column: column.name.clone(),
            values,
        })
    }
}

/// Column is null.
pub struct NullOperator;

impl ClauseOperator for NullOperator {
    fn needs_value(&self) -> bool {
        false
    }

    fn compile(&self, column: &ColumnDescriptor, _value: Option<&Json>) -> Result<Predicate, Error> {
        Ok(Predicate::IsNull {
            column: column.name.clone(),
        })
    }
}

/// Column is not null.
pub struct NotNullOperator;

impl ClauseOperator for NotNullOperator {
    fn needs_value(&self) -> bool {
        false
    }

    fn compile(&self, column: &ColumnDescriptor, _value: Option<&Json>) -> Result<Predicate, Error> {
        Ok(Predicate::IsNotNull {
            column: column.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{describe, Cardinality, RawColumn, RawRelationship, TableMetadata};
    use crate::geometry::GeoProvider;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn descriptor() -> SchemaDescriptor {
        describe(
            &TableMetadata::new("cadastre", "parcel")
                .with_column(RawColumn::new("id", "INTEGER").primary_key())
                .with_column(RawColumn::new("area_m2", "DOUBLE PRECISION"))
                .with_column(RawColumn::new("price", "NUMERIC(10,2)"))
                .with_column(RawColumn::new("status", "VARCHAR(1)"))
                .with_column(RawColumn::new("geom", "geometry(POLYGON,2056)"))
                .with_column(RawColumn::new("parts", "geometry(GEOMETRYCOLLECTION,2056)"))
                .with_relationship(RawRelationship::new(
                    "buildings",
                    "building",
                    Cardinality::OneToMany,
                )),
        )
        .unwrap()
    }

    fn compile(filter: Json) -> Result<Option<Predicate>, Error> {
        let node = FilterNode::from_json(&filter)?;
        compile_filter(&descriptor(), &node, &GeoProvider)
    }

    fn clause(column: &str, operator: &str, value: Json) -> Json {
        json!({"column_name": column, "operator": operator, "value": value})
    }

    #[test]
    fn test_comparison_coerces_operand() {
        let predicate = compile(clause("area_m2", ">", json!(100))).unwrap().unwrap();
        assert_eq!(
            predicate,
            Predicate::Compare {
                column: "area_m2".into(),
                op: CompareOp::Gt,
                value: Value::Float(100.0),
            }
        );

        let predicate = compile(clause("price", "<=", json!("9.90"))).unwrap().unwrap();
        assert!(matches!(
            predicate,
            Predicate::Compare { value: Value::Decimal(d), .. } if d == Decimal::new(990, 2)
        ));
    }

    #[test]
    fn test_in_splits_on_commas() {
        let predicate = compile(clause("id", "IN", json!("1, 2,3"))).unwrap().unwrap();
        assert_eq!(
            predicate,
            Predicate::In {
                column: "id".into(),
                values: vec![Value::Int(1), Value::Int(2), Value::Int(3)],
            }
        );

        // string members keep their surrounding spaces
        let predicate = compile(clause("status", "IN", json!("A, B"))).unwrap().unwrap();
        assert_eq!(
            predicate,
            Predicate::In {
                column: "status".into(),
                values: vec![Value::String("A".into()), Value::String(" B".into())],
            }
        );

        assert!(matches!(
            compile(clause("id", "IN", json!("1,x"))),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_null_operators_need_no_value() {
        let filter = json!({"column_name": "status", "operator": "NULL"});
        assert_eq!(
            compile(filter).unwrap(),
            Some(Predicate::IsNull {
                column: "status".into()
            })
        );
        assert!(matches!(
            compile(json!({"column_name": "status", "operator": "="})),
            Err(Error::MissingValue { .. })
        ));
    }

    #[test]
    fn test_blocks() {
        let empty = json!({"mode": "AND", "clauses": []});
        assert_eq!(compile(empty).unwrap(), None);

        let child = clause("status", "=", json!("A"));
        let single = json!({"mode": "OR", "clauses": [child.clone()]});
        assert_eq!(compile(single).unwrap(), compile(child.clone()).unwrap());

        // Mode is only consulted when there is something to combine.
        let single = json!({"mode": "XOR", "clauses": [child.clone()]});
        assert!(compile(single).unwrap().is_some());

        let pair = json!({"mode": "XOR", "clauses": [child.clone(), child]});
        assert!(matches!(compile(pair), Err(Error::UnsupportedMode(m)) if m == "XOR"));
    }

    #[test]
    fn test_nested_blocks() {
        let filter = json!({"mode": "AND", "clauses": [
            clause("id", ">", json!(1)),
            {"mode": "OR", "clauses": [
                clause("status", "=", json!("A")),
                clause("status", "LIKE", json!("B%")),
            ]},
            {"mode": "OR", "clauses": []},
        ]});

        match compile(filter).unwrap().unwrap() {
            Predicate::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[1], Predicate::Or(inner) if inner.len() == 2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_operator_errors() {
        assert!(matches!(
            compile(clause("status", "~", json!("A"))),
            Err(Error::UnsupportedOperator { operator, .. }) if operator == "~"
        ));
        assert!(matches!(
            compile(clause("geom", "=", json!("POINT(1 1)"))),
            Err(Error::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            compile(clause("status", "INTERSECTS", json!("POINT(1 1)"))),
            Err(Error::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            compile(clause("buildings", "=", json!("x"))),
            Err(Error::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            compile(clause("nope", "=", json!(1))),
            Err(Error::UnknownColumn { .. })
        ));
        assert!(matches!(
            compile(clause("id", "=", json!("one"))),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_custom_operator() {
        struct StartsWith;

        impl ClauseOperator for StartsWith {
            fn compile(
                &self,
                column: &ColumnDescriptor,
                value: Option<&Json>,
            ) -> Result<Predicate, Error> {
                let prefix = value.and_then(Json::as_str).unwrap_or_default();
                Ok(Predicate::Like {
                    column: column.name.clone(),
                    pattern: format!("{}%", prefix),
                })
            }
        }

        let table = OperatorTable::standard().with_operator("STARTS_WITH", StartsWith);
        assert!(table.spellings().contains(&"STARTS_WITH"));
        assert!(OperatorTable::shared().get("STARTS_WITH").is_none());

        let descriptor = descriptor();
        let node = FilterNode::from_json(&clause("status", "STARTS_WITH", json!("A"))).unwrap();
        let predicate = FilterCompiler::new(&descriptor, &GeoProvider)
            .with_operators(&table)
            .compile(&node)
            .unwrap();
        assert_eq!(
            predicate,
            Some(Predicate::Like {
                column: "status".into(),
                pattern: "A%".into()
            })
        );
    }

    fn spatial_parts(predicate: &Predicate) -> Vec<(Option<Dimension>, Option<Dimension>)> {
        match predicate {
            Predicate::Spatial(s) => vec![(s.stored_part, s.value_part)],
            Predicate::Or(children) => children.iter().flat_map(spatial_parts).collect(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_spatial_direct() {
        let predicate = compile(clause("geom", "INTERSECTS", json!("POINT(1 1)")))
            .unwrap()
            .unwrap();
        match &predicate {
            Predicate::Spatial(s) => {
                assert_eq!(s.op, SpatialOp::Intersects);
                assert_eq!(s.srid, 2056);
                assert!(s.wkt.starts_with("POINT"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_spatial_collection_cases() {
        let stored = compile(clause("parts", "WITHIN", json!("POLYGON((0 0,1 0,1 1,0 0))")))
            .unwrap()
            .unwrap();
        assert_eq!(
            spatial_parts(&stored),
            Dimension::ALL.iter().map(|d| (Some(*d), None)).collect::<Vec<_>>()
        );

        let supplied = compile(clause(
            "geom",
            "INTERSECTS",
            json!("MULTIPOINT((1 1),(2 2),(3 3),(4 4))"),
        ))
        .unwrap()
        .unwrap();
        assert!(matches!(&supplied, Predicate::Or(children) if children.len() == 3));
        assert_eq!(
            spatial_parts(&supplied),
            Dimension::ALL.iter().map(|d| (None, Some(*d))).collect::<Vec<_>>()
        );

        let both = compile(clause(
            "parts",
            "TOUCHES",
            json!("GEOMETRYCOLLECTION(POINT(1 1),LINESTRING(0 0,1 1))"),
        ))
        .unwrap()
        .unwrap();
        assert_eq!(
            spatial_parts(&both),
            Dimension::ALL.iter().map(|d| (Some(*d), Some(*d))).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_spatial_errors() {
        assert!(matches!(
            compile(clause("geom", "INTERSECTS", json!("POINT(1"))),
            Err(Error::InvalidGeometry { .. })
        ));
        assert!(matches!(
            compile(clause("geom", "INTERSECTS", json!(12))),
            Err(Error::InvalidGeometry { .. })
        ));
        assert!(matches!(
            compile(clause("geom", "INTERSECTS", json!("SRID=4326;POINT(1 1)"))),
            Err(Error::SridMismatch {
                expected: 2056,
                actual: 4326,
                ..
            })
        ));
        assert!(compile(clause("geom", "INTERSECTS", json!("SRID=2056;POINT(1 1)"))).is_ok());
        assert!(matches!(
            compile(json!({"column_name": "geom", "operator": "WITHIN"})),
            Err(Error::MissingValue { .. })
        ));
    }

    #[test]
    fn test_classify() {
        let descriptor = descriptor();
        let geom = descriptor.column("geom").unwrap();
        let parts = descriptor.column("parts").unwrap();

        assert_eq!(classify(geom, "POINT(1 1)").unwrap(), GeometryCase::Direct);
        assert_eq!(
            classify(geom, "SRID=2056;multipolygon(((0 0,1 0,1 1,0 0)))").unwrap(),
            GeometryCase::SuppliedCollection
        );
        assert_eq!(
            classify(parts, "POINT(1 1)").unwrap(),
            GeometryCase::StoredCollection
        );
        assert_eq!(
            classify(parts, "GEOMETRYCOLLECTION(POINT(1 1))").unwrap(),
            GeometryCase::BothCollections
        );
        assert!(matches!(
            classify(descriptor.column("status").unwrap(), "POINT(1 1)"),
            Err(Error::UnclassifiedGeometryComparison { .. })
        ));
    }
}
