//! Health check endpoint.

use axum::{extract::State, routing::get, Json, Router};

use crate::json::HealthResponse;
use crate::AppState;

/// Health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // A store that cannot open a session is reported as degraded.
    let store_ready = state
        .store
        .session()
        .map(|session| session.rollback())
        .is_ok();

    Json(HealthResponse {
        status: if store_ready { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.store.backend().to_string(),
        tables: state.tables.len(),
    })
}
