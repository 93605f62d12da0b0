//! DTOs for API responses.

use serde::{Deserialize, Serialize};
use viewgate_core::types::Row;

/// Query string for `GET /view`.
#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    /// Maximum rows to return
    pub limit: Option<u32>,
}

/// Response for `GET /view`.
///
/// Borrows the cached rows so serving a hit never copies them.
#[derive(Debug, Serialize)]
pub struct ViewResponse<'a> {
    pub rows: &'a [Row],
}

/// Response for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Response for `GET /`.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}
