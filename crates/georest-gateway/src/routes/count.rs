//! Count endpoint.

use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Router,
};
use bytes::Bytes;
use georest_core::query::QueryExecutor;
use georest_core::render::serialize_count;
use georest_proto::{FilterNode, Format};

use super::formatted;
use super::read::compile;
use crate::error::AppError;
use crate::AppState;

/// Count routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/:schema/:table/count",
        get(handle_count).post(handle_count_filtered),
    )
}

/// Count all records of a table.
async fn handle_count(
    State(state): State<AppState>,
    Path((schema, table)): Path<(String, String)>,
) -> Result<Response, AppError> {
    count(state, &schema, &table, None).await
}

/// Count the records matching the filter in the request body.
async fn handle_count_filtered(
    State(state): State<AppState>,
    Path((schema, table)): Path<(String, String)>,
    body: Bytes,
) -> Result<Response, AppError> {
    let filter = FilterNode::from_request_body(&body)?;
    count(state, &schema, &table, filter).await
}

async fn count(
    state: AppState,
    schema: &str,
    table: &str,
    filter: Option<FilterNode>,
) -> Result<Response, AppError> {
    let descriptor = state.tables.descriptor(schema, table)?;
    let predicate = compile(&state, &descriptor, filter.as_ref())?;

    let provider = state.provider.clone();
    let body = state
        .run_in_session(descriptor.qualified_name(), "count", move |session, _| {
            let count = QueryExecutor::new(provider.as_ref()).count(
                session,
                &descriptor,
                predicate.as_ref(),
            )?;
            serialize_count(count)
        })
        .await?;

    Ok(formatted(Format::Json, body))
}
