//! georest HTTP gateway binary.

use std::sync::Arc;

use clap::Parser;
use georest_core::storage::{SledStore, StorageConfig};
use georest_gateway::{create_router, AppState, Args, GatewayConfig, TableRegistry, TablesFile};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse command line args
    let args = Args::parse();
    let config = GatewayConfig::from(&args);

    info!(
        listen = %config.listen_addr,
        data_dir = %config.data_dir.display(),
        api_name = %config.api_name,
        "Starting georest gateway"
    );

    let definitions = match &config.tables_path {
        Some(path) => TablesFile::load(path)?.tables,
        None => Vec::new(),
    };

    // Schema problems are startup failures
    let registry = TableRegistry::from_definitions(&definitions);
    let described = registry.describe_all()?;
    if described == 0 {
        tracing::warn!("no tables configured");
    }

    let store = SledStore::open(
        StorageConfig::new(config.data_dir.clone()).with_cache_capacity(config.cache_capacity),
    )?;
    let seeded = registry.seed(&store, &definitions)?;
    store.flush()?;
    info!(
        tables = described,
        seeded_rows = seeded,
        recovered = store.was_recovered(),
        "Store ready"
    );

    let state = AppState::new(Arc::new(store), registry, config.clone());
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Gateway listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
