//! Value formatting shared by every output format.
//!
//! Dispatch is on the runtime shape of each value, not on the declared
//! column type.

use geo_types::{Coord, Geometry, LineString, Polygon};
use georest_proto::Value;
use rust_decimal::prelude::ToPrimitive;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value as Json};

use crate::catalog::SchemaDescriptor;
use crate::error::Error;
use crate::geometry::geometry_type_name;
use crate::storage::Record;

/// Format one value for output.
///
/// `column` names the value in errors.
pub fn format_value(value: &Value, column: &str) -> Result<Json, Error> {
    let json = match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => Json::from(*f),
        Value::Decimal(d) => d.to_f64().map(Json::from).unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::Date(_) | Value::DateTime(_) | Value::Time(_) => {
            value.to_text().map(Json::String).unwrap_or(Json::Null)
        }
        Value::Association(keys) => Json::Array(
            keys.iter()
                .map(|key| Json::String(join_key(key)))
                .collect(),
        ),
        Value::Geometry(geometry) => geometry_coordinates(geometry, column)?,
    };
    Ok(json)
}

/// Comma-joined text of one related record's primary key.
fn join_key(key: &[Value]) -> String {
    key.iter()
        .map(|v| v.to_text().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}

/// Coordinates of a geometry.
///
/// Points are `[x, y]`, lines lists of points, polygons the point list of
/// their exterior ring. Multi geometries and collections list their members.
pub fn geometry_coordinates(geometry: &Geometry<f64>, column: &str) -> Result<Json, Error> {
    let json = match geometry {
        Geometry::Point(p) => coord(&p.0),
        Geometry::LineString(ls) => line(ls),
        Geometry::Polygon(p) => polygon(p),
        Geometry::MultiPoint(mp) => Json::Array(mp.0.iter().map(|p| coord(&p.0)).collect()),
        Geometry::MultiLineString(mls) => Json::Array(mls.0.iter().map(line).collect()),
        Geometry::MultiPolygon(mp) => Json::Array(mp.0.iter().map(polygon).collect()),
        Geometry::GeometryCollection(gc) => Json::Array(
            gc.0.iter()
                .map(|member| geometry_coordinates(member, column))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        other => {
            return Err(Error::UnsupportedGeometryType {
                column: column.to_string(),
                subtype: geometry_type_name(other).to_string(),
                record: None,
            })
        }
    };
    Ok(json)
}

/// GeoJSON geometry object of a value, or null.
pub fn geometry_object(value: &Value, column: &str) -> Result<Json, Error> {
    match value {
        Value::Null => Ok(Json::Null),
        Value::Geometry(geometry) => {
            let coordinates = geometry_coordinates(geometry, column)?;
            Ok(json!({
                "type": geometry_type_name(geometry),
                "coordinates": coordinates,
            }))
        }
        other => Err(Error::UnsupportedGeometryType {
            column: column.to_string(),
            subtype: other.type_name().to_string(),
            record: None,
        }),
    }
}

fn coord(c: &Coord<f64>) -> Json {
    json!([c.x, c.y])
}

fn line(ls: &LineString<f64>) -> Json {
    Json::Array(ls.0.iter().map(coord).collect())
}

fn polygon(p: &Polygon<f64>) -> Json {
    line(p.exterior())
}

/// Formatted fields of a record, in column order.
///
/// Serializes as a JSON object without reordering keys.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedRow<'a> {
    fields: Vec<(&'a str, Json)>,
}

impl<'a> FormattedRow<'a> {
    /// Format every column of `descriptor` that `include` accepts.
    pub fn new(
        record: &Record,
        descriptor: &'a SchemaDescriptor,
        include: impl Fn(&crate::catalog::ColumnDescriptor) -> bool,
    ) -> Result<Self, Error> {
        let mut fields = Vec::with_capacity(descriptor.columns().len());
        for column in descriptor.columns().iter().filter(|c| include(c)) {
            let value = format_value(record.get_field(&column.name), &column.name)
                .map_err(|e| e.with_record(record.key_text(descriptor)))?;
            fields.push((column.name.as_str(), value));
        }
        Ok(Self { fields })
    }

    /// Formatted fields.
    pub fn fields(&self) -> &[(&'a str, Json)] {
        &self.fields
    }
}

impl Serialize for FormattedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
