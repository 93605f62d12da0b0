//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use viewgate_core::constants::DEFAULT_ROW_LIMIT;

use crate::auth::RequireApiKey;
use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// GET /view
///
/// The key is checked before the query string, so an unauthenticated
/// request gets 403 whatever its `limit`.
pub async fn read_view(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ViewQuery>, QueryRejection>,
) -> Result<Response> {
    let Query(params) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let limit = params.limit.unwrap_or(DEFAULT_ROW_LIMIT);
    if let Some(max) = state.config.max_limit.filter(|max| limit > *max) {
        return Err(ApiError::bad_request(format!("limit must be at most {}", max)));
    }

    let rows = state.cache.get(limit).await?;
    let served = rows.len().min(limit as usize);

    debug!(limit, cached = rows.len(), served, "Serving view rows");

    Ok(Json(ViewResponse {
        rows: &rows[..served],
    })
    .into_response())
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "viewgate running. Use /view with API key to get data.",
    })
}
