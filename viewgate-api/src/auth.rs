//! Shared-secret API key check.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use subtle::ConstantTimeEq;
use tracing::debug;

use viewgate_core::constants::API_KEY_HEADER;

use crate::error::ApiError;
use crate::state::AppState;

/// The configured secret.
///
/// Comparison runs in constant time over the key bytes. An empty secret
/// never matches, so a blank configuration cannot open the endpoint.
pub struct ApiKey(Vec<u8>);

impl ApiKey {
    /// Wraps the configured secret.
    pub fn new(secret: &str) -> Self {
        Self(secret.as_bytes().to_vec())
    }

    /// Returns true if `presented` equals the secret.
    pub fn verify(&self, presented: &[u8]) -> bool {
        !self.0.is_empty() && bool::from(self.0.as_slice().ct_eq(presented))
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Extractor that rejects the request unless `X-API-Key` matches.
///
/// Missing, malformed, and wrong keys all produce the same 403.
#[derive(Debug, Clone, Copy)]
pub struct RequireApiKey;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .map(|value| value.as_bytes())
            .unwrap_or_default();

        if state.api_key.verify(presented) {
            Ok(RequireApiKey)
        } else {
            debug!(path = %parts.uri.path(), "Rejected request with invalid API key");
            Err(ApiError::forbidden())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(b"s3cret-key", true ; "exact match")]
    #[test_case(b"s3cret-kez", false ; "same length mismatch")]
    #[test_case(b"s3cret", false ; "prefix")]
    #[test_case(b"s3cret-key-and-more", false ; "longer")]
    #[test_case(b"", false ; "empty")]
    fn test_verify(presented: &[u8], expected: bool) {
        assert_eq!(ApiKey::new("s3cret-key").verify(presented), expected);
    }

    #[test]
    fn test_empty_secret_never_matches() {
        assert!(!ApiKey::new("").verify(b""));
    }

    #[test]
    fn test_debug_is_redacted() {
        assert_eq!(format!("{:?}", ApiKey::new("hunter2")), "ApiKey(<redacted>)");
    }
}
