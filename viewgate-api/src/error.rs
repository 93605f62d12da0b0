//! API error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use viewgate_core::constants::INVALID_API_KEY_MESSAGE;
use viewgate_core::error::ViewgateError;

/// API error type, rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Missing or wrong API key. The message never says which.
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, INVALID_API_KEY_MESSAGE)
    }

    /// Bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<ViewgateError> for ApiError {
    /// Fetch failures reach trusted callers verbatim.
    fn from(err: ViewgateError) -> Self {
        tracing::error!(error = %err, recoverable = err.is_recoverable(), "View fetch failed");
        ApiError::internal(err.to_string())
    }
}
