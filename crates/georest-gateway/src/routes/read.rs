//! Read and show endpoints.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use bytes::Bytes;
use georest_core::query::{compile_filter, Paging, Predicate, QueryExecutor, ReadQuery, SortSpec};
use georest_core::render::serialize_to;
use georest_proto::{FilterNode, Format};
use tracing::instrument;

use super::formatted;
use crate::error::AppError;
use crate::json::ReadParams;
use crate::AppState;

/// Read routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:schema/:table/read/:format",
            get(handle_read).post(handle_read_filtered),
        )
        .route(
            "/:schema/:table/read/:format/*primary_keys",
            get(handle_show),
        )
}

/// Handle a read without filter.
async fn handle_read(
    State(state): State<AppState>,
    Path((schema, table, format)): Path<(String, String, String)>,
    Query(params): Query<ReadParams>,
) -> Result<Response, AppError> {
    read(state, &schema, &table, &format, params, None).await
}

/// Handle a read with a filter in the request body.
async fn handle_read_filtered(
    State(state): State<AppState>,
    Path((schema, table, format)): Path<(String, String, String)>,
    Query(params): Query<ReadParams>,
    body: Bytes,
) -> Result<Response, AppError> {
    let filter = FilterNode::from_request_body(&body)?;
    read(state, &schema, &table, &format, params, filter).await
}

#[instrument(skip(state, params, filter))]
async fn read(
    state: AppState,
    schema: &str,
    table: &str,
    format: &str,
    params: ReadParams,
    filter: Option<FilterNode>,
) -> Result<Response, AppError> {
    let format: Format = format.parse()?;
    let descriptor = state.tables.descriptor(schema, table)?;

    let predicate = compile(&state, &descriptor, filter.as_ref())?;
    let sort = SortSpec::from_params(
        &descriptor,
        params.order_by.as_deref(),
        params.direction.as_deref(),
    )?;
    let paging = Paging::from_params(params.offset.as_deref(), params.limit.as_deref())?;
    let query = ReadQuery::new()
        .with_predicate(predicate)
        .with_sort(sort)
        .with_paging(state.config.cap_paging(paging));

    let provider = state.provider.clone();
    let body = state
        .run_in_session(descriptor.qualified_name(), "read", move |session, cancel| {
            let records =
                QueryExecutor::new(provider.as_ref()).execute(session, &descriptor, &query)?;
            let mut buffer = Vec::new();
            serialize_to(&mut buffer, &records, &descriptor, format, cancel)?;
            Ok(Bytes::from(buffer))
        })
        .await?;

    Ok(formatted(format, body))
}

/// Handle a lookup by primary key path segments.
async fn handle_show(
    State(state): State<AppState>,
    Path((schema, table, format, primary_keys)): Path<(String, String, String, String)>,
) -> Result<Response, AppError> {
    let format: Format = format.parse()?;
    let descriptor = state.tables.descriptor(&schema, &table)?;
    let keys: Vec<String> = primary_keys
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    let provider = state.provider.clone();
    let body = state
        .run_in_session(descriptor.qualified_name(), "show", move |session, cancel| {
            let record = QueryExecutor::new(provider.as_ref())
                .find_by_primary_keys(session, &descriptor, &keys)?;
            let mut buffer = Vec::new();
            serialize_to(&mut buffer, &[record], &descriptor, format, cancel)?;
            Ok(Bytes::from(buffer))
        })
        .await?;

    Ok(formatted(format, body))
}

/// Compile an optional filter against a table.
pub(crate) fn compile(
    state: &AppState,
    descriptor: &georest_core::SchemaDescriptor,
    filter: Option<&FilterNode>,
) -> Result<Option<Predicate>, AppError> {
    match filter {
        Some(node) => Ok(compile_filter(descriptor, node, state.provider.as_ref())?),
        None => Ok(None),
    }
}
