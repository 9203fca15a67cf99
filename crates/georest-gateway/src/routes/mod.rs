//! HTTP route handlers.

pub mod count;
pub mod health;
pub mod model;
pub mod read;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use georest_proto::Format;

/// Response carrying an already serialized body.
pub(crate) fn formatted(format: Format, body: Bytes) -> Response {
    ([(header::CONTENT_TYPE, format.content_type())], body).into_response()
}
