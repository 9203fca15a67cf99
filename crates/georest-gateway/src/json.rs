//! JSON request and response types for the HTTP gateway.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status.
    pub status: String,
    /// Gateway version.
    pub version: String,
    /// Store backend name.
    pub backend: String,
    /// Number of served tables.
    pub tables: usize,
}

/// Sort and paging query parameters of read requests.
///
/// Values are kept as text so that malformed values are reported with the
/// parameter name instead of a generic rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ReadParams {
    /// Column to sort on.
    pub order_by: Option<String>,
    /// Sort direction.
    pub direction: Option<String>,
    /// Records to skip.
    pub offset: Option<String>,
    /// Maximum records to return.
    pub limit: Option<String>,
}
