//! Model description endpoint.

use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Router,
};
use georest_core::render::serialize_model;
use georest_proto::Format;

use super::formatted;
use crate::error::AppError;
use crate::AppState;

/// Model routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/:schema/:table/model/:format", get(handle_model))
}

/// Describe a table as `json` or `xml`.
async fn handle_model(
    State(state): State<AppState>,
    Path((schema, table, format)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let format: Format = format.parse()?;
    let descriptor = state.tables.descriptor(&schema, &table)?;
    let body = serialize_model(&descriptor, format)?;
    Ok(formatted(format, body))
}
