//! Default geometry provider backed by `wkt` and `geo`.

use geo::coordinate_position::CoordPos;
use geo::dimensions::Dimensions;
use geo::{CoordsIter, HasDimensions, Relate};
use geo_types::{
    Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use wkt::{ToWkt, TryFromWkt};

use super::{Dimension, GeometryError, GeometryProvider, ParsedGeometry, SpatialOp};

/// Planar geometry provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoProvider;

impl GeoProvider {
    /// Create a provider.
    pub fn new() -> Self {
        Self
    }
}

impl GeometryProvider for GeoProvider {
    fn parse_wkt(&self, text: &str) -> Result<ParsedGeometry, GeometryError> {
        let (srid, body) = split_ewkt(text)?;
        let geometry = Geometry::<f64>::try_from_wkt_str(body)
            .map_err(|e| GeometryError::Parse(e.to_string()))?;
        Ok(ParsedGeometry { geometry, srid })
    }

    fn to_wkt(&self, geometry: &Geometry<f64>) -> String {
        geometry.wkt_string()
    }

    fn collection_extract(&self, geometry: &Geometry<f64>, dimension: Dimension) -> Geometry<f64> {
        let mut parts = Parts::default();
        parts.collect(geometry, dimension);
        match dimension {
            Dimension::Point => MultiPoint(parts.points).into(),
            Dimension::Line => MultiLineString(parts.lines).into(),
            Dimension::Polygon => MultiPolygon(parts.polygons).into(),
        }
    }

    fn relate(
        &self,
        op: SpatialOp,
        a: &Geometry<f64>,
        b: &Geometry<f64>,
    ) -> Result<bool, GeometryError> {
        if a.is_empty() || b.is_empty() {
            return Ok(false);
        }
        if !is_finite(a) || !is_finite(b) {
            return Err(GeometryError::Unsupported(format!(
                "{} with non-finite coordinates",
                op
            )));
        }

        let matrix = a.relate(b);
        let meets = |lhs, rhs| matrix.get(lhs, rhs) != Dimensions::Empty;

        let result = match op {
            SpatialOp::Intersects => matrix.is_intersects(),
            SpatialOp::Within => matrix.is_within(),
            SpatialOp::Touches => {
                !meets(CoordPos::Inside, CoordPos::Inside)
                    && (meets(CoordPos::Inside, CoordPos::OnBoundary)
                        || meets(CoordPos::OnBoundary, CoordPos::Inside)
                        || meets(CoordPos::OnBoundary, CoordPos::OnBoundary))
            }
            SpatialOp::CoveredBy => {
                matrix.is_intersects()
                    && !meets(CoordPos::Inside, CoordPos::Outside)
                    && !meets(CoordPos::OnBoundary, CoordPos::Outside)
            }
        };
        Ok(result)
    }
}

fn is_finite(geometry: &Geometry<f64>) -> bool {
    geometry
        .coords_iter()
        .all(|c| c.x.is_finite() && c.y.is_finite())
}

/// Split an optional `SRID=n;` prefix off EWKT.
fn split_ewkt(text: &str) -> Result<(Option<i32>, &str), GeometryError> {
    let trimmed = text.trim();
    let has_prefix = trimmed
        .get(..5)
        .map(|head| head.eq_ignore_ascii_case("SRID="))
        .unwrap_or(false);
    if !has_prefix {
        return Ok((None, trimmed));
    }

    let (srid, body) = trimmed[5..]
        .split_once(';')
        .ok_or_else(|| GeometryError::Parse(format!("missing ';' after SRID in {}", text)))?;
    let srid = srid
        .trim()
        .parse()
        .map_err(|_| GeometryError::Parse(format!("invalid SRID {}", srid)))?;
    Ok((Some(srid), body.trim()))
}

#[derive(Default)]
struct Parts {
    points: Vec<Point<f64>>,
    lines: Vec<LineString<f64>>,
    polygons: Vec<Polygon<f64>>,
}

impl Parts {
    fn collect(&mut self, geometry: &Geometry<f64>, dimension: Dimension) {
        match (geometry, dimension) {
            (Geometry::Point(p), Dimension::Point) => self.points.push(*p),
            (Geometry::MultiPoint(mp), Dimension::Point) => self.points.extend(mp.0.iter().copied()),
            (Geometry::Line(l), Dimension::Line) => {
                self.lines.push(LineString::from(vec![l.start, l.end]))
            }
            (Geometry::LineString(ls), Dimension::Line) => self.lines.push(ls.clone()),
            (Geometry::MultiLineString(mls), Dimension::Line) => {
                self.lines.extend(mls.0.iter().cloned())
            }
            (Geometry::Polygon(p), Dimension::Polygon) => self.polygons.push(p.clone()),
            (Geometry::MultiPolygon(mp), Dimension::Polygon) => {
                self.polygons.extend(mp.0.iter().cloned())
            }
            (Geometry::Rect(r), Dimension::Polygon) => self.polygons.push(r.to_polygon()),
            (Geometry::Triangle(t), Dimension::Polygon) => self.polygons.push(t.to_polygon()),
            (Geometry::GeometryCollection(gc), _) => {
                for member in &gc.0 {
                    self.collect(member, dimension);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Geometry<f64> {
        GeoProvider.parse_wkt(text).unwrap().geometry
    }

    #[test]
    fn test_parse_wkt_and_ewkt() {
        let parsed = GeoProvider.parse_wkt("POINT(2600000 1200000)").unwrap();
        assert_eq!(parsed.srid, None);
        assert_eq!(parsed.geometry, Point::new(2600000.0, 1200000.0).into());

        let parsed = GeoProvider.parse_wkt("SRID=2056;POINT(1 2)").unwrap();
        assert_eq!(parsed.srid, Some(2056));

        let parsed = GeoProvider.parse_wkt("srid=4326; POINT(1 2)").unwrap();
        assert_eq!(parsed.srid, Some(4326));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            GeoProvider.parse_wkt("POINT(1"),
            Err(GeometryError::Parse(_))
        ));
        assert!(matches!(
            GeoProvider.parse_wkt("SRID=abc;POINT(1 2)"),
            Err(GeometryError::Parse(_))
        ));
        assert!(matches!(
            GeoProvider.parse_wkt("SRID=2056 POINT(1 2)"),
            Err(GeometryError::Parse(_))
        ));
    }

    #[test]
    fn test_wkt_output_parses_back() {
        let geometry = parse("POLYGON((0 0,4 0,4 4,0 4,0 0))");
        let text = GeoProvider.to_wkt(&geometry);
        assert!(text.starts_with("POLYGON"));
        assert_eq!(parse(&text), geometry);
    }

    #[test]
    fn test_collection_extract() {
        let collection = parse(
            "GEOMETRYCOLLECTION(POINT(1 1),LINESTRING(0 0,1 1),POLYGON((0 0,1 0,1 1,0 0)),\
             GEOMETRYCOLLECTION(POINT(2 2)))",
        );

        match GeoProvider.collection_extract(&collection, Dimension::Point) {
            Geometry::MultiPoint(mp) => assert_eq!(mp.0.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        match GeoProvider.collection_extract(&collection, Dimension::Line) {
            Geometry::MultiLineString(mls) => assert_eq!(mls.0.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
        match GeoProvider.collection_extract(&collection, Dimension::Polygon) {
            Geometry::MultiPolygon(mp) => assert_eq!(mp.0.len(), 1),
            other => panic!("unexpected {:?}", other),
        }

        let point = parse("POINT(1 1)");
        assert!(GeoProvider
            .collection_extract(&point, Dimension::Polygon)
            .is_empty());
    }

    #[test]
    fn test_relate() {
        let square = parse("POLYGON((0 0,10 0,10 10,0 10,0 0))");
        let inside = parse("POINT(5 5)");
        let corner = parse("POINT(0 0)");
        let outside = parse("POINT(20 20)");
        let edge = parse("LINESTRING(0 0,10 0)");

        let relate = |op, a, b| GeoProvider.relate(op, a, b).unwrap();

        assert!(relate(SpatialOp::Intersects, &inside, &square));
        assert!(relate(SpatialOp::Intersects, &corner, &square));
        assert!(!relate(SpatialOp::Intersects, &outside, &square));

        assert!(relate(SpatialOp::Within, &inside, &square));
        assert!(!relate(SpatialOp::Within, &corner, &square));
        assert!(!relate(SpatialOp::Within, &edge, &square));

        assert!(relate(SpatialOp::CoveredBy, &corner, &square));
        assert!(relate(SpatialOp::CoveredBy, &edge, &square));
        assert!(!relate(SpatialOp::CoveredBy, &outside, &square));

        assert!(relate(SpatialOp::Touches, &corner, &square));
        assert!(relate(SpatialOp::Touches, &edge, &square));
        assert!(!relate(SpatialOp::Touches, &inside, &square));
    }

    #[test]
    fn test_non_finite_coordinates_are_rejected() {
        let square = parse("POLYGON((0 0,10 0,10 10,0 10,0 0))");
        let broken: Geometry<f64> = Point::new(f64::NAN, 1.0).into();
        assert!(matches!(
            GeoProvider.relate(SpatialOp::Intersects, &broken, &square),
            Err(GeometryError::Unsupported(_))
        ));
    }

    #[test]
    fn test_empty_parts_never_match() {
        let square = parse("POLYGON((0 0,10 0,10 10,0 10,0 0))");
        let empty = GeoProvider.collection_extract(&parse("POINT(5 5)"), Dimension::Line);
        assert!(!GeoProvider
            .relate(SpatialOp::Intersects, &empty, &square)
            .unwrap());
    }
}
