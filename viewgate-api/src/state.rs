//! App state: config, API key, view cache.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::HeaderValue;

use viewgate_cache::{CacheConfig, ViewCache};
use viewgate_core::constants::*;
use viewgate_core::error::{Result, ViewgateError};
use viewgate_core::traits::ViewSource;
use viewgate_core::types::validate_identifier;
use viewgate_source::{LibsqlSource, SourceConfig};

use crate::auth::ApiKey;

/// Server configuration, normally read from the environment.
#[derive(Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub database_auth_token: Option<String>,
    pub api_key: String,
    pub cache_ttl_seconds: u64,
    pub view_name: String,
    pub preload_limit: u32,
    /// Largest accepted `limit`; `None` leaves `/view` uncapped
    pub max_limit: Option<u32>,
    pub serve_stale_on_error: bool,
    pub cors_origins: Vec<String>,
    pub bind_addr: SocketAddr,
}

impl ApiConfig {
    /// Creates a config with defaults for everything but the two required
    /// values.
    pub fn new(database_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            database_auth_token: None,
            api_key: api_key.into(),
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECS,
            view_name: DEFAULT_VIEW_NAME.into(),
            preload_limit: PRELOAD_LIMIT,
            max_limit: None,
            serve_stale_on_error: false,
            cors_origins: vec![DEFAULT_CORS_ORIGIN.into()],
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        }
    }

    /// Reads the config from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| ViewgateError::Config("DATABASE_URL is required".into()))?;
        let api_key = get("API_KEY")
            .ok_or_else(|| ViewgateError::Config("API_KEY is required".into()))?;

        let mut config = Self::new(database_url, api_key);
        config.database_auth_token = get("DATABASE_AUTH_TOKEN");

        if let Some(v) = get("CACHE_TTL") {
            config.cache_ttl_seconds = parse_var("CACHE_TTL", &v)?;
        }
        if let Some(v) = get("VIEW_NAME") {
            config.view_name = v.trim().to_string();
        }
        if let Some(v) = get("PRELOAD_LIMIT") {
            config.preload_limit = parse_var("PRELOAD_LIMIT", &v)?;
        }
        if let Some(v) = get("VIEW_MAX_LIMIT") {
            config.max_limit = Some(parse_var("VIEW_MAX_LIMIT", &v)?);
        }
        if let Some(v) = get("SERVE_STALE_ON_ERROR") {
            config.serve_stale_on_error = parse_flag("SERVE_STALE_ON_ERROR", &v)?;
        }
        if let Some(v) = get("CORS_ORIGINS") {
            config.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = get("BIND_ADDR") {
            config.bind_addr = parse_var("BIND_ADDR", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ViewgateError::Config("API_KEY must not be empty".into()));
        }
        validate_identifier(&self.view_name)?;
        if self.cache_ttl_seconds > MAX_CACHE_TTL_SECS {
            return Err(ViewgateError::Config(format!(
                "CACHE_TTL must be at most {} seconds, got {}",
                MAX_CACHE_TTL_SECS, self.cache_ttl_seconds
            )));
        }
        if self.max_limit == Some(0) {
            return Err(ViewgateError::Config("VIEW_MAX_LIMIT must be at least 1".into()));
        }
        for origin in &self.cors_origins {
            HeaderValue::from_str(origin).map_err(|_| {
                ViewgateError::Config(format!("invalid CORS origin '{}'", origin))
            })?;
        }
        Ok(())
    }

    /// Cache settings derived from this config.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl_seconds: self.cache_ttl_seconds,
            preload_limit: self.preload_limit,
            serve_stale_on_error: self.serve_stale_on_error,
        }
    }

    /// Database settings derived from this config.
    pub fn source_config(&self) -> SourceConfig {
        let config = SourceConfig::new(&self.database_url, &self.view_name);
        match &self.database_auth_token {
            Some(token) => config.with_auth_token(token),
            None => config,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("database_url", &self.database_url)
            .field("database_auth_token", &self.database_auth_token.as_ref().map(|_| "<redacted>"))
            .field("api_key", &"<redacted>")
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("view_name", &self.view_name)
            .field("preload_limit", &self.preload_limit)
            .field("max_limit", &self.max_limit)
            .field("serve_stale_on_error", &self.serve_stale_on_error)
            .field("cors_origins", &self.cors_origins)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ViewgateError::Config(format!("{} has an invalid value: '{}'", name, value)))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ViewgateError::Config(format!(
            "{} must be a boolean, got '{}'",
            name, value
        ))),
    }
}

/// Shared state handed to every handler.
pub struct AppState {
    pub config: ApiConfig,
    pub api_key: ApiKey,
    pub cache: ViewCache,
}

impl AppState {
    /// Builds state around an existing source.
    pub fn new(config: ApiConfig, source: Arc<dyn ViewSource>) -> Self {
        Self {
            api_key: ApiKey::new(&config.api_key),
            cache: ViewCache::from_arc(source, config.cache_config()),
            config,
        }
    }

    /// Opens the configured database and builds state around it.
    pub async fn connect(config: ApiConfig) -> Result<Self> {
        let source = LibsqlSource::connect(config.source_config()).await?;
        Ok(Self::new(config, Arc::new(source)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [("DATABASE_URL", "libsql://db.turso.io"), ("API_KEY", "k3y")];

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.cache_ttl_seconds, 60);
        assert_eq!(config.view_name, "VORP_Latest");
        assert_eq!(config.preload_limit, 100);
        assert_eq!(config.max_limit, None);
        assert!(!config.serve_stale_on_error);
        assert_eq!(config.cors_origins, ["https://dynastypulse.com"]);
        assert_eq!(config.bind_addr.port(), 8000);
        assert!(config.database_auth_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("CACHE_TTL", "5"),
            ("VIEW_NAME", "Weekly_Ranks"),
            ("SERVE_STALE_ON_ERROR", "yes"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_AUTH_TOKEN", "tok"),
            ("VIEW_MAX_LIMIT", "500"),
        ]);
        let config = ApiConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.cache_ttl_seconds, 5);
        assert_eq!(config.view_name, "Weekly_Ranks");
        assert!(config.serve_stale_on_error);
        assert_eq!(config.cors_origins, ["https://a.example", "https://b.example"]);
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.source_config().auth_token.as_deref(), Some("tok"));
        assert_eq!(config.cache_config().ttl_seconds, 5);
        assert_eq!(config.max_limit, Some(500));
    }

    #[test]
    fn test_missing_required() {
        let err = ApiConfig::from_lookup(lookup(&[("DATABASE_URL", "x")])).unwrap_err();
        assert!(err.to_string().contains("API_KEY"));

        let err = ApiConfig::from_lookup(lookup(&[("API_KEY", "x")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let err = ApiConfig::from_lookup(lookup(&[("DATABASE_URL", "x"), ("API_KEY", "  ")])).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_invalid_values() {
        for (name, value) in [
            ("CACHE_TTL", "soon"),
            ("CACHE_TTL", "-1"),
            ("CACHE_TTL", "18446744073709551615"),
            ("CACHE_TTL", "31536001"),
            ("VIEW_NAME", "x; DROP TABLE y"),
            ("VIEW_MAX_LIMIT", "0"),
            ("SERVE_STALE_ON_ERROR", "maybe"),
            ("BIND_ADDR", "localhost"),
        ] {
            let mut vars = REQUIRED.to_vec();
            vars.push((name, value));
            let err = ApiConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(err.is_config_error(), "{}={} should be rejected", name, value);
        }
    }

    #[test]
    fn test_ttl_upper_bound() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("CACHE_TTL", "31536000"));
        let config = ApiConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.cache_ttl_seconds, MAX_CACHE_TTL_SECS);

        let mut config = ApiConfig::new("libsql://db", "k3y");
        config.cache_ttl_seconds = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("CACHE_TTL"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = ApiConfig::new("libsql://db", "super-secret");
        config.database_auth_token = Some("token-value".into());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("token-value"));
    }
}
