//! Geometry provider interface.
//!
//! The filter compiler, the predicate evaluator and the stores never parse or
//! compare geometries themselves; they call a [`GeometryProvider`]. The
//! default [`GeoProvider`] is built on the `wkt` and `geo` crates.

mod provider;

pub use provider::GeoProvider;

use std::fmt;

use geo_types::Geometry;
use thiserror::Error;

/// Errors raised by a geometry provider.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Text is not valid (E)WKT.
    #[error("cannot parse geometry: {0}")]
    Parse(String),

    /// The provider cannot evaluate the requested operation.
    #[error("unsupported geometry operation: {0}")]
    Unsupported(String),
}

/// Geometric dimension used to pick sub-parts out of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Points.
    Point = 1,
    /// Lines.
    Line = 2,
    /// Polygons.
    Polygon = 3,
}

impl Dimension {
    /// All dimensions, in extraction order.
    pub const ALL: [Dimension; 3] = [Dimension::Point, Dimension::Line, Dimension::Polygon];

    /// Numeric code as used by `ST_CollectionExtract`.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

/// Spatial relationship tested by a geometric clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialOp {
    /// The geometries share at least one point.
    Intersects,
    /// The geometries share boundary points but no interior points.
    Touches,
    /// No point of the first geometry lies outside the second.
    CoveredBy,
    /// The first geometry lies in the interior of the second.
    Within,
}

impl SpatialOp {
    /// Parse a clause operator.
    pub fn from_operator(operator: &str) -> Option<Self> {
        match operator {
            "INTERSECTS" => Some(SpatialOp::Intersects),
            "TOUCHES" => Some(SpatialOp::Touches),
            "COVERED_BY" => Some(SpatialOp::CoveredBy),
            "WITHIN" => Some(SpatialOp::Within),
            _ => None,
        }
    }

    /// Clause operator text.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpatialOp::Intersects => "INTERSECTS",
            SpatialOp::Touches => "TOUCHES",
            SpatialOp::CoveredBy => "COVERED_BY",
            SpatialOp::Within => "WITHIN",
        }
    }

    /// PostGIS function implementing the operator.
    pub fn sql_function(&self) -> &'static str {
        match self {
            SpatialOp::Intersects => "ST_Intersects",
            SpatialOp::Touches => "ST_Touches",
            SpatialOp::CoveredBy => "ST_CoveredBy",
            SpatialOp::Within => "ST_Within",
        }
    }
}

impl fmt::Display for SpatialOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed geometry with the SRID its text declared, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGeometry {
    /// The geometry.
    pub geometry: Geometry<f64>,
    /// SRID from an EWKT `SRID=n;` prefix.
    pub srid: Option<i32>,
}

/// Geometry operations the core depends on.
pub trait GeometryProvider: Send + Sync {
    /// Parse WKT, or EWKT with an `SRID=n;` prefix.
    fn parse_wkt(&self, text: &str) -> Result<ParsedGeometry, GeometryError>;

    /// Format a geometry as WKT.
    fn to_wkt(&self, geometry: &Geometry<f64>) -> String;

    /// Collect the parts of one dimension into a multi geometry, like
    /// `ST_CollectionExtract`. The result is empty if there are none.
    fn collection_extract(&self, geometry: &Geometry<f64>, dimension: Dimension) -> Geometry<f64>;

    /// Test a spatial relationship between `a` and `b`.
    fn relate(
        &self,
        op: SpatialOp,
        a: &Geometry<f64>,
        b: &Geometry<f64>,
    ) -> Result<bool, GeometryError>;
}

/// Name of a geometry's subtype, as used in GeoJSON.
pub fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
