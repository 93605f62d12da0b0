//! viewgate CLI
//!
//! Runs the viewgate API server, or performs a one-off fetch against the
//! configured view to check connectivity.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use viewgate_api::{ApiConfig, ApiServer};
use viewgate_core::constants::{DEFAULT_ROW_LIMIT, DEFAULT_VIEW_NAME};
use viewgate_core::ViewSource;
use viewgate_source::{LibsqlSource, SourceConfig};

/// viewgate - cached, API-key protected access to a database view
#[derive(Parser)]
#[command(name = "viewgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preload the cache and run the API server
    Serve {
        /// Address to listen on (overrides BIND_ADDR)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
        /// Cache TTL in seconds (overrides CACHE_TTL)
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Fetch rows once, bypassing the cache, and print them as JSON
    Fetch {
        /// Maximum rows to fetch
        #[arg(short, long, default_value_t = DEFAULT_ROW_LIMIT)]
        limit: u32,
        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
        /// Database URL
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
        /// Auth token for remote databases
        #[arg(long, env = "DATABASE_AUTH_TOKEN", hide_env_values = true)]
        auth_token: Option<String>,
        /// View to read
        #[arg(long, env = "VIEW_NAME", default_value = DEFAULT_VIEW_NAME)]
        view: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads env-backed arguments
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Serve { bind, ttl } => cmd_serve(bind, ttl).await,
        Commands::Fetch {
            limit,
            pretty,
            database_url,
            auth_token,
            view,
        } => {
            let mut config = SourceConfig::new(database_url, view);
            config.auth_token = auth_token;
            cmd_fetch(config, limit, pretty).await
        }
    }
}

fn init_logging(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "viewgate=debug,tower_http=debug,info"
    } else {
        "viewgate=info,tower_http=info,warn"
    };

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()));

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Load config, preload, serve. Any failure before binding aborts startup.
async fn cmd_serve(bind: Option<SocketAddr>, ttl: Option<u64>) -> Result<()> {
    let mut config = ApiConfig::from_env().context("Invalid configuration")?;
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    if let Some(ttl) = ttl {
        config.cache_ttl_seconds = ttl;
    }
    config.validate().context("Invalid configuration")?;

    info!(?config, "Starting viewgate");

    let server = ApiServer::connect(config)
        .await
        .context("Failed to open database")?;

    let rows = server
        .preload()
        .await
        .context("Startup cache preload failed")?;
    info!(rows, "Cache preloaded, accepting traffic");

    let state = server.state().clone();
    server.run().await.context("API server failed")?;

    let stats = serde_json::to_string(&state.cache.stats())?;
    info!(%stats, "viewgate stopped");
    Ok(())
}

/// One uncached fetch, printed in the same shape `/view` returns.
async fn cmd_fetch(config: SourceConfig, limit: u32, pretty: bool) -> Result<()> {
    let source = LibsqlSource::connect(config)
        .await
        .context("Failed to open database")?;

    let rows = source
        .fetch(limit)
        .await
        .with_context(|| format!("Failed to read {}", source.describe()))?;

    info!(rows = rows.len(), limit, view = source.view_name(), "Fetched view");

    let body = serde_json::json!({ "rows": rows });
    let rendered = if pretty {
        serde_json::to_string_pretty(&body)?
    } else {
        serde_json::to_string(&body)?
    };
    println!("{}", rendered);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["viewgate", "-v", "serve", "--bind", "127.0.0.1:9000", "--ttl", "5"])
            .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Serve { bind, ttl } => {
                assert_eq!(bind, Some("127.0.0.1:9000".parse().unwrap()));
                assert_eq!(ttl, Some(5));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from([
            "viewgate",
            "fetch",
            "--limit",
            "3",
            "--database-url",
            "libsql://db.turso.io",
            "--view",
            "Weekly_Ranks",
        ])
        .unwrap();
        match cli.command {
            Commands::Fetch { limit, database_url, view, .. } => {
                assert_eq!(limit, 3);
                assert_eq!(database_url, "libsql://db.turso.io");
                assert_eq!(view, "Weekly_Ranks");
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_serve_rejects_bad_bind() {
        assert!(Cli::try_parse_from(["viewgate", "serve", "--bind", "nowhere"]).is_err());
    }
}
