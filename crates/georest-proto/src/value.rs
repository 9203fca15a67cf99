//! Runtime value types.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use geo_types::Geometry;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Textual form of a date value.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Textual form of a date-time value. Fractional seconds are omitted when zero.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
/// Textual form of a time-of-day value.
pub const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// A value read from a record field or supplied in a filter clause.
///
/// The variant reflects the runtime shape of the value, which is what the
/// record serializer dispatches on. Declared column types only guide how
/// client input is coerced into one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Arbitrary-precision decimal.
    Decimal(Decimal),
    /// UTF-8 string.
    String(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time of day, without zone.
    DateTime(NaiveDateTime),
    /// Time of day.
    Time(NaiveTime),
    /// Decoded geometry.
    Geometry(Geometry<f64>),
    /// Primary keys of the records on the far side of a collection-valued
    /// relationship, one inner list per related record.
    Association(Vec<Vec<Value>>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Time(_) => "time",
            Value::Geometry(_) => "geometry",
            Value::Association(_) => "association",
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64, widening integers and decimals.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as geometry reference.
    pub fn as_geometry(&self) -> Option<&Geometry<f64>> {
        match self {
            Value::Geometry(g) => Some(g),
            _ => None,
        }
    }

    /// Text cast of a scalar value.
    ///
    /// Returns `None` for null, geometry and association values, which have
    /// no scalar text form.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
            Value::DateTime(dt) => Some(dt.format(DATETIME_FORMAT).to_string()),
            Value::Time(t) => Some(t.format(TIME_FORMAT).to_string()),
            Value::Null | Value::Geometry(_) | Value::Association(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<Geometry<f64>> for Value {
    fn from(v: Geometry<f64>) -> Self {
        Value::Geometry(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
