//! Compiled predicates.
//!
//! A [`Predicate`] is the executable form of a filter tree. Column names are
//! already checked against the table and operands already coerced to the
//! column's type, so evaluating or rendering a predicate cannot fail on
//! client input.

use std::fmt;

use geo_types::Geometry;
use georest_proto::Value;

use crate::geometry::{Dimension, SpatialOp};

/// Scalar comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Parse a clause operator.
    pub fn from_operator(operator: &str) -> Option<Self> {
        match operator {
            "=" | "==" => Some(CompareOp::Eq),
            "<>" | "!=" => Some(CompareOp::Ne),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            _ => None,
        }
    }

    /// SQL spelling.
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A spatial relationship between a geometry column and a supplied geometry.
///
/// Either side may be narrowed to the parts of one dimension before the
/// comparison, as `ST_CollectionExtract` does.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialPredicate {
    /// Relationship tested.
    pub op: SpatialOp,
    /// Geometry column.
    pub column: String,
    /// CRS of the column, applied to the supplied geometry.
    pub srid: i32,
    /// Dimension extracted from the stored geometry, if any.
    pub stored_part: Option<Dimension>,
    /// Dimension extracted from the supplied geometry, if any.
    pub value_part: Option<Dimension>,
    /// Supplied geometry, already narrowed to `value_part`.
    pub geometry: Geometry<f64>,
    /// WKT of the whole supplied geometry.
    pub wkt: String,
}

/// Executable boolean condition over a table's records.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// All children hold.
    And(Vec<Predicate>),
    /// At least one child holds.
    Or(Vec<Predicate>),
    /// Column compared with a constant.
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// Column text matches a `LIKE` pattern.
    Like { column: String, pattern: String },
    /// Column equals one of the values.
    In { column: String, values: Vec<Value> },
    /// Column is null.
    IsNull { column: String },
    /// Column is not null.
    IsNotNull { column: String },
    /// Spatial relationship.
    Spatial(SpatialPredicate),
}

impl Predicate {
    /// Number of leaf conditions.
    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().map(Predicate::leaf_count).sum()
            }
            _ => 1,
        }
    }

    /// Names of the columns the predicate reads, in first-use order.
    pub fn columns(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_columns(&mut names);
        names
    }

    fn collect_columns<'a>(&'a self, names: &mut Vec<&'a str>) {
        let column = match self {
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_columns(names);
                }
                return;
            }
            Predicate::Compare { column, .. }
            | Predicate::Like { column, .. }
            | Predicate::In { column, .. }
            | Predicate::IsNull { column }
            | Predicate::IsNotNull { column } => column,
            Predicate::Spatial(spatial) => &spatial.column,
        };
        if !names.contains(&column.as_str()) {
            names.push(column);
        }
    }
}
