//! georest HTTP gateway.
//!
//! Serves registered tables under `/{api_name}/{schema}/{table}/...` with
//! read, show, count and model operations. Every operation runs inside a
//! store session that is committed on success and rolled back on error.

pub mod config;
pub mod error;
pub mod json;
pub mod registry;
pub mod routes;

pub use config::{Args, GatewayConfig, TableDefinition, TablesFile};
pub use error::AppError;
pub use registry::TableRegistry;

use std::sync::Arc;

use axum::Router;
use georest_core::geometry::{GeoProvider, GeometryProvider};
use georest_core::storage::{Session, Store};
use georest_core::{CancelToken, Error, ErrorKind};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Record store.
    pub store: Arc<dyn Store>,
    /// Served tables.
    pub tables: Arc<TableRegistry>,
    /// Geometry provider for filters and stored geometries.
    pub provider: Arc<dyn GeometryProvider>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: Arc<dyn Store>, tables: TableRegistry, config: GatewayConfig) -> Self {
        Self {
            store,
            tables: Arc::new(tables),
            provider: Arc::new(GeoProvider),
            config,
        }
    }

    /// Use a different geometry provider.
    pub fn with_provider(mut self, provider: Arc<dyn GeometryProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Run `work` inside a store session on the blocking pool.
    ///
    /// The session is committed when `work` succeeds and rolled back when it
    /// fails. If the request times out or the handler is dropped, the
    /// cancel token handed to `work` is set.
    pub async fn run_in_session<T, F>(
        &self,
        table: String,
        operation: &'static str,
        work: F,
    ) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Session, &CancelToken) -> Result<T, Error> + Send + 'static,
    {
        let cancel = CancelToken::new();
        let _guard = CancelOnDrop(cancel.clone());
        let store = self.store.clone();
        let task_table = table.clone();

        let handle = tokio::task::spawn_blocking(move || -> Result<T, Error> {
            let session = store.session()?;
            match work(session.as_ref(), &cancel) {
                Ok(value) => {
                    session.commit()?;
                    Ok(value)
                }
                Err(err) => {
                    session.rollback();
                    debug!(table = %task_table, operation, "rolled back session");
                    Err(err)
                }
            }
        });

        let result = match tokio::time::timeout(self.config.request_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                error!(table = %table, operation, error = %join_error, "request task failed");
                return Err(AppError::Internal(join_error.to_string()));
            }
            Err(_) => {
                warn!(
                    table = %table,
                    operation,
                    timeout_ms = self.config.request_timeout.as_millis() as u64,
                    "request timed out"
                );
                return Err(AppError::Timeout);
            }
        };

        result.map_err(|err| {
            match err.kind() {
                ErrorKind::Server => error!(table = %table, operation, error = %err, "request failed"),
                _ => debug!(table = %table, operation, error = %err, "request rejected"),
            }
            AppError::from(err)
        })
    }
}

/// Sets a cancel token when dropped.
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let tables = Router::new()
        .merge(routes::read::routes())
        .merge(routes::count::routes())
        .merge(routes::model::routes());

    let prefix = state.config.route_prefix();
    let router = Router::new().merge(routes::health::routes());
    let router = if prefix.is_empty() {
        router.merge(tables)
    } else {
        router.nest(&prefix, tables)
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
