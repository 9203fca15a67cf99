//! Conversion between JSON and [`Value`]s.
//!
//! Decoding is type-directed: the logical type of the target column decides
//! how a JSON value is read. Failures carry a reason; callers decide whether
//! that makes a client error (filter operands) or a server error (stored
//! rows).

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use georest_proto::value::{DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT};
use georest_proto::Value;
use rust_decimal::Decimal;
use serde_json::Value as Json;

use crate::catalog::{ColumnDescriptor, LogicalType};
use crate::geometry::GeometryProvider;

/// Read a JSON scalar as a value of the column's type.
///
/// Geometry columns are not handled here; their values go through a
/// [`GeometryProvider`].
pub fn coerce(column: &ColumnDescriptor, json: &Json) -> Result<Value, String> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    if json.is_array() || json.is_object() {
        return Err("expected a scalar".to_string());
    }

    match column.logical_type {
        LogicalType::Boolean => coerce_bool(json),
        LogicalType::Integer => coerce_int(json),
        LogicalType::Float if column.exact_numeric => coerce_decimal(json),
        LogicalType::Float => coerce_float(json),
        LogicalType::String => Ok(Value::String(scalar_text(json))),
        LogicalType::Date => parse_date(&expect_str(json)?).map(Value::Date),
        LogicalType::DateTime => parse_datetime(&expect_str(json)?).map(Value::DateTime),
        LogicalType::Time => parse_time(&expect_str(json)?).map(Value::Time),
        LogicalType::Geometry(_) => Err("geometry values must be WKT".to_string()),
        LogicalType::Unknown => Ok(scalar(json)),
    }
}

/// Read text (a path segment or an `IN` member) as a value of the column's type.
pub fn coerce_text(column: &ColumnDescriptor, text: &str) -> Result<Value, String> {
    match column.logical_type {
        LogicalType::String | LogicalType::Unknown => Ok(Value::String(text.to_string())),
        _ => coerce(column, &Json::String(text.trim().to_string())),
    }
}

/// Read a JSON scalar without a target type.
pub fn scalar(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        Json::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

/// Decode a stored JSON field into a value of the column's type.
pub fn decode_stored(
    column: &ColumnDescriptor,
    json: &Json,
    provider: &dyn GeometryProvider,
) -> Result<Value, String> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    if column.is_collection_valued {
        let members = json.as_array().ok_or("expected an array of keys")?;
        let keys = members
            .iter()
            .map(|member| match member {
                Json::Array(parts) => parts.iter().map(scalar).collect(),
                other => vec![scalar(other)],
            })
            .collect();
        return Ok(Value::Association(keys));
    }
    if column.is_geometry() {
        let text = json.as_str().ok_or("expected WKT text")?;
        let parsed = provider.parse_wkt(text).map_err(|e| e.to_string())?;
        return Ok(Value::Geometry(parsed.geometry));
    }
    coerce(column, json)
}

/// Encode a value for storage.
///
/// Decimals are stored as strings so they keep their precision.
pub fn encode_stored(value: &Value, provider: &dyn GeometryProvider) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => Json::from(*f),
        Value::Decimal(d) => Json::String(d.to_string()),
        Value::String(s) => Json::String(s.clone()),
        Value::Date(_) | Value::DateTime(_) | Value::Time(_) => {
            value.to_text().map(Json::String).unwrap_or(Json::Null)
        }
        Value::Geometry(g) => Json::String(provider.to_wkt(g)),
        Value::Association(keys) => Json::Array(
            keys.iter()
                .map(|key| Json::Array(key.iter().map(|v| encode_stored(v, provider)).collect()))
                .collect(),
        ),
    }
}

fn coerce_bool(json: &Json) -> Result<Value, String> {
    match json {
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => match n.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err("expected a boolean".to_string()),
        },
        Json::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "0" => Ok(Value::Bool(false)),
            _ => Err("expected a boolean".to_string()),
        },
        _ => Err("expected a boolean".to_string()),
    }
}

fn coerce_int(json: &Json) -> Result<Value, String> {
    match json {
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::Int(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::Int(f as i64)),
                _ => Err("expected an integer".to_string()),
            }
        }
        Json::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| "expected an integer".to_string()),
        _ => Err("expected an integer".to_string()),
    }
}

fn coerce_float(json: &Json) -> Result<Value, String> {
    match json {
        Json::Number(n) => n
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| "expected a number".to_string()),
        Json::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| "expected a number".to_string()),
        _ => Err("expected a number".to_string()),
    }
}

fn coerce_decimal(json: &Json) -> Result<Value, String> {
    let text = match json {
        Json::Number(n) => n.to_string(),
        Json::String(s) => s.trim().to_string(),
        _ => return Err("expected a number".to_string()),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Value::Decimal)
        .map_err(|_| "expected a number".to_string())
}

fn expect_str(json: &Json) -> Result<String, String> {
    json.as_str()
        .map(str::to_string)
        .ok_or_else(|| "expected a string".to_string())
}

fn scalar_text(json: &Json) -> String {
    match json {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(text: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|e| format!("expected a date (YYYY-MM-DD): {}", e))
}

/// Parse an ISO date-time, with `T` or space separator, or RFC 3339 with offset.
pub fn parse_datetime(text: &str) -> Result<NaiveDateTime, String> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.naive_utc()))
        .map_err(|e| format!("expected a date-time (YYYY-MM-DDTHH:MM:SS): {}", e))
}

/// Parse an `HH:MM[:SS[.fff]]` time of day.
pub fn parse_time(text: &str) -> Result<NaiveTime, String> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|e| format!("expected a time (HH:MM:SS): {}", e))
}
