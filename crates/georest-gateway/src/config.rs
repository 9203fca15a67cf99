//! Gateway configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use georest_core::catalog::TableMetadata;
use georest_core::query::Paging;
use serde::Deserialize;
use thiserror::Error;

/// georest HTTP gateway command line arguments.
#[derive(Debug, Parser)]
#[command(name = "georest-gateway")]
#[command(about = "REST gateway for relational and geospatial tables")]
pub struct Args {
    /// Address to listen on for HTTP requests.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Directory of the sled store.
    #[arg(short, long, default_value = "./georest-data")]
    pub data_dir: PathBuf,

    /// JSON file with table metadata and optional seed rows.
    #[arg(short, long)]
    pub tables: Option<PathBuf>,

    /// Path prefix of the table routes.
    #[arg(long, default_value = "api")]
    pub api_name: String,

    /// Per-request timeout (ms).
    #[arg(long, default_value_t = 30_000)]
    pub request_timeout_ms: u64,

    /// Upper bound on the number of records one read returns.
    #[arg(long)]
    pub max_limit: Option<u64>,

    /// Sled page cache size in bytes.
    #[arg(long, default_value_t = 256 * 1024 * 1024)]
    pub cache_capacity: u64,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to listen on for HTTP requests.
    pub listen_addr: String,
    /// Directory of the sled store.
    pub data_dir: PathBuf,
    /// Table definitions file.
    pub tables_path: Option<PathBuf>,
    /// Path prefix of the table routes, without slashes.
    pub api_name: String,
    /// Per-request timeout enforced at the gateway.
    pub request_timeout: Duration,
    /// Upper bound on the number of records one read returns.
    pub max_limit: Option<u64>,
    /// Sled page cache size in bytes.
    pub cache_capacity: u64,
}

impl GatewayConfig {
    /// Route prefix, e.g. `/api`. Empty when routes are served at the root.
    pub fn route_prefix(&self) -> String {
        let name = self.api_name.trim_matches('/');
        if name.is_empty() {
            String::new()
        } else {
            format!("/{}", name)
        }
    }

    /// Apply `max_limit` to the requested paging.
    pub fn cap_paging(&self, paging: Option<Paging>) -> Option<Paging> {
        match (paging, self.max_limit) {
            (paging, None) => paging,
            (None, Some(max)) => Some(Paging::new(0, max)),
            (Some(paging), Some(max)) => Some(Paging::new(paging.offset, paging.limit.min(max))),
        }
    }
}

impl From<&Args> for GatewayConfig {
    fn from(args: &Args) -> Self {
        Self {
            listen_addr: args.listen.clone(),
            data_dir: args.data_dir.clone(),
            tables_path: args.tables.clone(),
            api_name: args.api_name.trim_matches('/').to_string(),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            max_limit: args.max_limit,
            cache_capacity: args.cache_capacity,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            data_dir: PathBuf::from("./georest-data"),
            tables_path: None,
            api_name: "api".to_string(),
            request_timeout: Duration::from_secs(30),
            max_limit: None,
            cache_capacity: 256 * 1024 * 1024,
        }
    }
}

/// Errors raised while loading table definitions.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid definitions document.
    #[error("invalid table definitions in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Two definitions name the same table.
    #[error("table {0} is defined twice")]
    DuplicateTable(String),
}

/// One table served by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct TableDefinition {
    /// Table metadata.
    #[serde(flatten)]
    pub metadata: TableMetadata,
    /// Rows written into an empty table at startup.
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
}

/// Document listing the served tables.
#[derive(Debug, Clone, Deserialize)]
pub struct TablesFile {
    /// Table definitions.
    pub tables: Vec<TableDefinition>,
}

impl TablesFile {
    /// Parse a definitions document.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let file: TablesFile = serde_json::from_str(text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let mut seen = std::collections::HashSet::new();
        for table in &file.tables {
            let name = format!("{}.{}", table.metadata.schema, table.metadata.name);
            if !seen.insert(name.clone()) {
                return Err(ConfigError::DuplicateTable(name));
            }
        }
        Ok(file)
    }

    /// Load a definitions document from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }
}
