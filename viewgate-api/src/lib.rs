//! # viewgate API Server
//!
//! Read-only HTTP access to one database view, behind a shared API key and
//! a TTL snapshot cache.
//!
//! ## Endpoints
//!
//! - `GET /` - Service banner
//! - `GET /health` - Liveness check
//! - `GET /view?limit=N` - Up to `N` rows of the view (needs `X-API-Key`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use viewgate_api::{ApiServer, ApiConfig};
//!
//! let config = ApiConfig::from_env()?;
//! let server = ApiServer::connect(config).await?;
//! server.preload().await?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod auth;
mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use auth::{ApiKey, RequireApiKey};
pub use error::ApiError;
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use viewgate_core::error::Result;

/// API server for viewgate.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server around prepared state.
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Opens the configured database and creates a server for it.
    pub async fn connect(config: ApiConfig) -> Result<Self> {
        Ok(Self::new(AppState::connect(config).await?))
    }

    /// Returns the shared state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Loads the initial snapshot. Run before [`run`](Self::run).
    pub async fn preload(&self) -> Result<usize> {
        self.state.cache.preload().await
    }

    /// Creates the router with CORS and request tracing.
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
            .layer(cors_layer(&self.state.config.cors_origins))
            .layer(TraceLayer::new_for_http())
    }

    /// Serves on the configured address until Ctrl-C or SIGTERM.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.state.config.bind_addr;
        self.run_on(addr).await
    }

    /// Serves on `addr` until Ctrl-C or SIGTERM.
    pub async fn run_on(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("viewgate API server listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

/// Allow-listed origins may use any method and header, with credentials.
///
/// Credentials rule out `*`, so methods and headers mirror the preflight.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;
    use viewgate_source::MemorySource;

    fn server(origins: &[&str]) -> ApiServer {
        let mut config = ApiConfig::new("libsql://unused", "k");
        config.cors_origins = origins.iter().map(|o| o.to_string()).collect();
        ApiServer::new(AppState::new(config, Arc::new(MemorySource::default())))
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/view")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-api-key")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_cors_allows_listed_origin() {
        let app = server(&["https://dynastypulse.com"]).router();
        let response = app.oneshot(preflight("https://dynastypulse.com")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://dynastypulse.com"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "x-api-key");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET");
    }

    #[tokio::test]
    async fn test_cors_ignores_unlisted_origin() {
        let app = server(&["https://dynastypulse.com"]).router();
        let response = app.oneshot(preflight("https://evil.example")).await.unwrap();

        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_preload_through_server() {
        let source = Arc::new(MemorySource::new(vec![Default::default(); 3]));
        let config = ApiConfig::new("libsql://unused", "k");
        let server = ApiServer::new(AppState::new(config, source.clone()));

        assert_eq!(server.preload().await.unwrap(), 3);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(server.state().cache.stats().cached_rows, Some(3));
    }
}
