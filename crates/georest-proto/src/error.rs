//! Protocol error types.

use thiserror::Error;

/// Errors raised while reading client-supplied wire input.
#[derive(Debug, Error)]
pub enum Error {
    /// A filter clause or block lacks a required key.
    #[error("somewhere in the filter the {field} is missing")]
    MissingField { field: &'static str },

    /// A filter node has the wrong JSON shape.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The requested response format is not known.
    #[error("the format {0} is not defined")]
    UnsupportedFormat(String),

    /// The request body is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
