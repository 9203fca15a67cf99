//! Error handling for the gateway.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use georest_core::{Error, ErrorKind};
use serde::Serialize;
use tracing::debug;

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Internal server error. The message is logged, not returned.
    Internal(String),
    /// Bad request.
    BadRequest(String),
    /// Not found.
    NotFound(String),
    /// The request did not finish within the configured timeout.
    Timeout,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error flag.
    pub error: bool,
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

impl AppError {
    /// HTTP status of the error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match self {
            AppError::Internal(_) => ("INTERNAL_ERROR", "internal server error".to_string()),
            AppError::BadRequest(msg) => ("BAD_REQUEST", msg),
            AppError::NotFound(msg) => ("NOT_FOUND", msg),
            AppError::Timeout => ("TIMEOUT", "the request timed out".to_string()),
        };
        debug!(status = status.as_u16(), code, %message, "request failed");

        let body = ErrorResponse {
            error: true,
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err.kind() {
            ErrorKind::Client => AppError::BadRequest(err.to_string()),
            ErrorKind::NotFound => AppError::NotFound(err.to_string()),
            ErrorKind::Server => AppError::Internal(err.to_string()),
        }
    }
}

impl From<georest_proto::Error> for AppError {
    fn from(err: georest_proto::Error) -> Self {
        Error::from(err).into()
    }
}
