//! Error types for viewgate.
//!
//! Library crates return [`ViewgateError`]; the HTTP layer maps it onto
//! status codes and the binary wraps it with `anyhow` context.

use thiserror::Error;

/// Result type alias using `ViewgateError`.
pub type Result<T> = std::result::Result<T, ViewgateError>;

/// Main error type for all viewgate operations.
#[derive(Debug, Error)]
pub enum ViewgateError {
    // ═══════════════════════════════════════════════════════════════════════════
    // DATA SOURCE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Query failed on the database side.
    #[error("Database error: {0}")]
    Database(String),

    /// Could not open a connection to the database.
    #[error("Connection error: {0}")]
    Connection(String),

    /// View name is not a plain SQL identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ViewgateError {
    /// Returns true if a later attempt may succeed without intervention.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ViewgateError::Database(_) | ViewgateError::Connection(_)
        )
    }

    /// Returns true if this error stems from configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ViewgateError::Config(_) | ViewgateError::InvalidIdentifier(_)
        )
    }
}
