//! Column type classification.
//!
//! Store type names are reduced to a closed set of logical types. Names that
//! are not recognized classify as [`LogicalType::String`].

use serde::{Serialize, Serializer};

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    /// Boolean.
    Boolean,
    /// Integer of any width.
    Integer,
    /// Floating point or fixed-precision numeric.
    Float,
    /// Character data.
    String,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Time of day.
    Time,
    /// Geometry of the given subtype.
    Geometry(GeometryKind),
    /// The store reported no type.
    Unknown,
}

/// Declared geometry subtype of a geometry column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Any geometry.
    Geometry,
    /// Point.
    Point,
    /// Line string.
    LineString,
    /// Polygon.
    Polygon,
    /// Curve.
    Curve,
    /// Multi point.
    MultiPoint,
    /// Multi line string.
    MultiLineString,
    /// Multi polygon.
    MultiPolygon,
    /// Heterogeneous collection of the above.
    GeometryCollection,
}

impl GeometryKind {
    /// Parse a geometry subtype name, ignoring case and Z/M suffixes.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let base = upper
            .strip_suffix("ZM")
            .or_else(|| upper.strip_suffix('Z'))
            .or_else(|| upper.strip_suffix('M'))
            .filter(|b| Self::exact(b).is_some())
            .unwrap_or(upper.as_str());
        Self::exact(base)
    }

    fn exact(name: &str) -> Option<Self> {
        match name {
            "GEOMETRY" => Some(GeometryKind::Geometry),
            "POINT" => Some(GeometryKind::Point),
            "LINESTRING" => Some(GeometryKind::LineString),
            "POLYGON" => Some(GeometryKind::Polygon),
            "CURVE" => Some(GeometryKind::Curve),
            "MULTIPOINT" => Some(GeometryKind::MultiPoint),
            "MULTILINESTRING" => Some(GeometryKind::MultiLineString),
            "MULTIPOLYGON" => Some(GeometryKind::MultiPolygon),
            "GEOMETRYCOLLECTION" => Some(GeometryKind::GeometryCollection),
            _ => None,
        }
    }

    /// Upper-case subtype name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Geometry => "GEOMETRY",
            GeometryKind::Point => "POINT",
            GeometryKind::LineString => "LINESTRING",
            GeometryKind::Polygon => "POLYGON",
            GeometryKind::Curve => "CURVE",
            GeometryKind::MultiPoint => "MULTIPOINT",
            GeometryKind::MultiLineString => "MULTILINESTRING",
            GeometryKind::MultiPolygon => "MULTIPOLYGON",
            GeometryKind::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }
}

impl LogicalType {
    /// Name of the type as exposed in the table document.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::Boolean => "boolean",
            LogicalType::Integer => "integer",
            LogicalType::Float => "float",
            LogicalType::String => "string",
            LogicalType::Date => "date",
            LogicalType::DateTime => "datetime",
            LogicalType::Time => "time",
            LogicalType::Geometry(kind) => kind.as_str(),
            LogicalType::Unknown => "unknown",
        }
    }

    /// Check if this is a geometry type.
    pub fn is_geometry(&self) -> bool {
        matches!(self, LogicalType::Geometry(_))
    }
}

impl Serialize for LogicalType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A store type name split into its base name and arguments.
///
/// `geometry(POLYGON, 2056)` has base `GEOMETRY` and arguments
/// `["POLYGON", "2056"]`; `character varying(100)` has base
/// `CHARACTER VARYING` and argument `["100"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreType {
    /// Upper-cased base name with runs of whitespace collapsed.
    pub base: String,
    /// Arguments inside the parentheses.
    pub args: Vec<String>,
}

impl StoreType {
    /// Split a store type name.
    pub fn parse(type_name: &str) -> Self {
        let (head, args) = match type_name.find('(') {
            Some(open) => {
                let close = type_name[open..]
                    .find(')')
                    .map(|i| open + i)
                    .unwrap_or(type_name.len());
                let args = type_name[open + 1..close]
                    .split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect();
                (&type_name[..open], args)
            }
            None => (type_name, Vec::new()),
        };

        let base = head
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        Self { base, args }
    }

    /// Classify into a logical type.
    pub fn logical_type(&self) -> LogicalType {
        match self.base.as_str() {
            "" => LogicalType::Unknown,
            "BOOLEAN" | "BOOL" => LogicalType::Boolean,
            "INTEGER" | "INT" | "INT2" | "INT4" | "INT8" | "BIGINT" | "SMALLINT" | "SERIAL"
            | "BIGSERIAL" | "SMALLSERIAL" => LogicalType::Integer,
            "NUMERIC" | "DECIMAL" | "NUMBER" | "FLOAT" | "FLOAT4" | "FLOAT8" | "REAL"
            | "DOUBLE" | "DOUBLE PRECISION" | "DOUBLE_PRECISION" => LogicalType::Float,
            "UNICODE" | "STRING" | "CHAR" | "CHARACTER" | "NCHAR" | "VARCHAR"
            | "CHARACTER VARYING" | "VARCHAR2" | "NVARCHAR2" | "TEXT" | "LONG" | "CLOB"
            | "NCLOB" => LogicalType::String,
            "DATE" => LogicalType::Date,
            "DATETIME" | "TIMESTAMP" | "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE"
            | "TIMESTAMP WITHOUT TIME ZONE" => LogicalType::DateTime,
            "TIME" | "TIMETZ" | "TIME WITH TIME ZONE" | "TIME WITHOUT TIME ZONE" => {
                LogicalType::Time
            }
            "GEOMETRY" | "GEOGRAPHY" => LogicalType::Geometry(
                self.args
                    .first()
                    .and_then(|a| GeometryKind::from_name(a))
                    .unwrap_or(GeometryKind::Geometry),
            ),
            other => GeometryKind::from_name(other)
                .map(LogicalType::Geometry)
                .unwrap_or(LogicalType::String),
        }
    }

    /// Check if values are fixed-precision decimals.
    pub fn is_exact_numeric(&self) -> bool {
        matches!(self.base.as_str(), "NUMERIC" | "DECIMAL" | "NUMBER")
    }

    /// Character length, for character types.
    pub fn length(&self) -> Option<u32> {
        match self.logical_type() {
            LogicalType::String => self.numeric_arg(0),
            _ => None,
        }
    }

    /// Precision, for numeric types.
    pub fn precision(&self) -> Option<u32> {
        match self.logical_type() {
            LogicalType::Float => self.numeric_arg(0),
            _ => None,
        }
    }

    /// Scale, for numeric types.
    pub fn scale(&self) -> Option<u32> {
        match self.logical_type() {
            LogicalType::Float => self.numeric_arg(1),
            _ => None,
        }
    }

    /// SRID given as the second argument of a geometry type.
    pub fn srid(&self) -> Option<i32> {
        match self.logical_type() {
            LogicalType::Geometry(_) => self.args.get(1).and_then(|a| a.parse().ok()),
            _ => None,
        }
    }

    fn numeric_arg(&self, index: usize) -> Option<u32> {
        self.args.get(index).and_then(|a| a.parse().ok())
    }
}
