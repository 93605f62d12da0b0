//! Service defaults for viewgate.
//!
//! Every value here can be overridden through configuration; these are the
//! fallbacks used when a variable is unset.

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Default snapshot time-to-live, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Rows fetched by the startup preload, regardless of later request limits.
pub const PRELOAD_LIMIT: u32 = 100;

/// Longest accepted snapshot TTL, in seconds (one year).
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

// ═══════════════════════════════════════════════════════════════════════════════
// VIEW QUERIES
// ═══════════════════════════════════════════════════════════════════════════════

/// View queried when `VIEW_NAME` is unset.
pub const DEFAULT_VIEW_NAME: &str = "VORP_Latest";

/// Row limit applied when a `/view` request carries no `limit`.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Longest view identifier accepted.
pub const MAX_IDENTIFIER_LEN: usize = 128;

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP
// ═══════════════════════════════════════════════════════════════════════════════

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Origin allowed by CORS when `CORS_ORIGINS` is unset.
pub const DEFAULT_CORS_ORIGIN: &str = "https://dynastypulse.com";

/// Port bound on all interfaces when `BIND_ADDR` is unset.
pub const DEFAULT_PORT: u16 = 8000;

/// Body message returned for every rejected credential.
pub const INVALID_API_KEY_MESSAGE: &str = "Invalid API Key";
