//! In-process predicate evaluation.

use std::cmp::Ordering;

use georest_proto::Value;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use super::predicate::{CompareOp, Predicate, SpatialPredicate};
use crate::error::Error;
use crate::geometry::GeometryProvider;
use crate::storage::Record;

/// Length of the text cast applied to a column before `LIKE` matching.
pub const LIKE_CAST_LENGTH: usize = 100;

/// Evaluates compiled predicates against records.
pub struct PredicateEvaluator<'a> {
    provider: &'a dyn GeometryProvider,
}

impl<'a> PredicateEvaluator<'a> {
    /// Create an evaluator using `provider` for spatial tests.
    pub fn new(provider: &'a dyn GeometryProvider) -> Self {
        Self { provider }
    }

    /// Evaluate a predicate against a record.
    ///
    /// Null fields never satisfy a comparison, pattern, membership or
    /// spatial test.
    pub fn evaluate(&self, predicate: &Predicate, record: &Record) -> Result<bool, Error> {
        match predicate {
            Predicate::And(children) => {
                for child in children {
                    if !self.evaluate(child, record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(children) => {
                for child in children {
                    if self.evaluate(child, record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Compare { column, op, value } => {
                let field = record.get_field(column);
                if field.is_null() {
                    return Ok(false);
                }
                Ok(match op {
                    CompareOp::Eq => values_equal(field, value),
                    CompareOp::Ne => !values_equal(field, value),
                    CompareOp::Lt => compare_values(field, value).map_or(false, Ordering::is_lt),
                    CompareOp::Le => compare_values(field, value).map_or(false, Ordering::is_le),
                    CompareOp::Gt => compare_values(field, value).map_or(false, Ordering::is_gt),
                    CompareOp::Ge => compare_values(field, value).map_or(false, Ordering::is_ge),
                })
            }
            Predicate::Like { column, pattern } => match record.get_field(column).to_text() {
                Some(text) => {
                    let cast: String = text.chars().take(LIKE_CAST_LENGTH).collect();
                    Ok(like_match(&cast, pattern))
                }
                None => Ok(false),
            },
            Predicate::In { column, values } => {
                let field = record.get_field(column);
                if field.is_null() {
                    return Ok(false);
                }
                Ok(values.iter().any(|v| values_equal(field, v)))
            }
            Predicate::IsNull { column } => Ok(record.get_field(column).is_null()),
            Predicate::IsNotNull { column } => Ok(!record.get_field(column).is_null()),
            Predicate::Spatial(spatial) => self.evaluate_spatial(spatial, record),
        }
    }

    fn evaluate_spatial(&self, spatial: &SpatialPredicate, record: &Record) -> Result<bool, Error> {
        let stored = match record.get_field(&spatial.column) {
            Value::Geometry(geometry) => geometry,
            _ => return Ok(false),
        };

        let extracted;
        let stored = match spatial.stored_part {
            Some(dimension) => {
                extracted = self.provider.collection_extract(stored, dimension);
                &extracted
            }
            None => stored,
        };

        self.provider
            .relate(spatial.op, stored, &spatial.geometry)
            .map_err(|e| Error::Geometry {
                operator: spatial.op.to_string(),
                column: spatial.column.clone(),
                record: None,
                reason: e.to_string(),
            })
    }
}

/// Check if two values are equal, across numeric representations.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Int(_) | Value::Float(_) | Value::Decimal(_), _) => {
            compare_values(a, b) == Some(Ordering::Equal)
        }
        (Value::DateTime(x), Value::Date(y)) | (Value::Date(y), Value::DateTime(x)) => {
            x.date() == *y && x.time() == chrono::NaiveTime::MIN
        }
        _ => a == b,
    }
}

/// Compare two values, returning their ordering if comparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Decimal(x), Value::Decimal(y)) => Some(x.cmp(y)),
        (Value::Decimal(x), Value::Int(y)) => Some(x.cmp(&Decimal::from(*y))),
        (Value::Int(x), Value::Decimal(y)) => Some(Decimal::from(*x).cmp(y)),
        (Value::Decimal(x), Value::Float(y)) => match Decimal::from_f64(*y) {
            Some(y) => Some(x.cmp(&y)),
            None => a.as_f64()?.partial_cmp(y),
        },
        (Value::Float(x), Value::Decimal(y)) => match Decimal::from_f64(*x) {
            Some(x) => Some(x.cmp(y)),
            None => x.partial_cmp(&b.as_f64()?),
        },
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::Date(y)) => Some(x.cmp(&y.and_time(chrono::NaiveTime::MIN))),
        (Value::Date(x), Value::DateTime(y)) => Some(x.and_time(chrono::NaiveTime::MIN).cmp(y)),
        (Value::Time(x), Value::Time(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Match a string against a SQL LIKE pattern.
///
/// `%` matches any run of characters and `_` exactly one. A backslash makes
/// the next pattern character literal.
pub fn like_match(value: &str, pattern: &str) -> bool {
    let tokens = like_tokens(pattern);
    let text: Vec<char> = value.chars().collect();

    let (mut t, mut p) = (0, 0);
    // Pattern position after the last `%` and the text position it resumes at.
    let mut resume: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(LikeToken::AnyRun) => {
                p += 1;
                resume = Some((p, t));
            }
            Some(LikeToken::AnyOne) => {
                p += 1;
                t += 1;
            }
            Some(LikeToken::Literal(c)) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match resume {
                Some((after_run, start)) => {
                    p = after_run;
                    t = start + 1;
                    resume = Some((after_run, start + 1));
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|token| *token == LikeToken::AnyRun)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    AnyRun,
    AnyOne,
    Literal(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::AnyRun,
            '_' => LikeToken::AnyOne,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            c => LikeToken::Literal(c),
        });
    }
    tokens
}
