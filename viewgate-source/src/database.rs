//! libSQL-backed view source.
//!
//! Reads a single view from a Turso/libSQL database. Remote URLs
//! (`libsql://`, `http://`, `https://`) are always supported; local database
//! files need the `local` feature, which pulls in the bundled SQLite engine.

use async_trait::async_trait;
use libsql::{Builder, Database, Value as SqlValue};
use serde_json::{Number, Value};
use tracing::{debug, info, instrument};

use viewgate_core::error::{Result, ViewgateError};
use viewgate_core::traits::ViewSource;
use viewgate_core::types::{validate_identifier, Row};

/// Connection settings for [`LibsqlSource`].
#[derive(Clone)]
pub struct SourceConfig {
    /// Database URL or local path
    pub url: String,
    /// Auth token for remote databases
    pub auth_token: Option<String>,
    /// View (or table) to read
    pub view_name: String,
}

impl SourceConfig {
    /// Creates a config with no auth token.
    pub fn new(url: impl Into<String>, view_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            view_name: view_name.into(),
        }
    }

    /// Sets the auth token used for remote connections.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Returns true if the URL points at a remote libSQL server.
    pub fn is_remote(&self) -> bool {
        ["libsql://", "http://", "https://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
    }
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("url", &self.url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("view_name", &self.view_name)
            .finish()
    }
}

/// View source backed by a libSQL database.
///
/// Every fetch opens a fresh connection from the database handle, so a
/// dropped connection never outlives a single request.
pub struct LibsqlSource {
    db: Database,
    view_name: String,
    query: String,
}

impl LibsqlSource {
    /// Opens the database described by `config`.
    ///
    /// Fails with [`ViewgateError::InvalidIdentifier`] before touching the
    /// database if the view name is not a plain identifier.
    pub async fn connect(config: SourceConfig) -> Result<Self> {
        validate_identifier(&config.view_name)?;

        let db = if config.is_remote() {
            Builder::new_remote(
                config.url.clone(),
                config.auth_token.clone().unwrap_or_default(),
            )
            .build()
            .await
            .map_err(|e| ViewgateError::Connection(e.to_string()))?
        } else {
            open_local(&config.url).await?
        };

        info!(
            remote = config.is_remote(),
            view = %config.view_name,
            "Opened libSQL database"
        );

        Self::from_database(db, &config.view_name)
    }

    /// Wraps an already-open database handle.
    pub fn from_database(db: Database, view_name: &str) -> Result<Self> {
        let view_name = validate_identifier(view_name)?.to_string();
        let query = format!("SELECT * FROM \"{}\" LIMIT ?1", view_name);

        Ok(Self {
            db,
            view_name,
            query,
        })
    }

    /// Returns the view this source reads.
    pub fn view_name(&self) -> &str {
        &self.view_name
    }
}

#[cfg(feature = "local")]
async fn open_local(url: &str) -> Result<Database> {
    let path = url.strip_prefix("file:").unwrap_or(url);
    Builder::new_local(path)
        .build()
        .await
        .map_err(|e| ViewgateError::Connection(e.to_string()))
}

#[cfg(not(feature = "local"))]
async fn open_local(url: &str) -> Result<Database> {
    Err(ViewgateError::Config(format!(
        "'{}' is not a remote libSQL URL; local databases need the `local` feature",
        url
    )))
}

fn query_error(err: libsql::Error) -> ViewgateError {
    ViewgateError::Database(err.to_string())
}

/// Maps a SQLite scalar onto JSON. BLOBs become lowercase hex.
fn to_json(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

#[async_trait]
impl ViewSource for LibsqlSource {
    #[instrument(skip(self), fields(view = %self.view_name))]
    async fn fetch(&self, limit: u32) -> Result<Vec<Row>> {
        let conn = self
            .db
            .connect()
            .map_err(|e| ViewgateError::Connection(e.to_string()))?;

        let mut rows = conn
            .query(&self.query, libsql::params![i64::from(limit)])
            .await
            .map_err(query_error)?;

        let columns: Vec<String> = (0..rows.column_count())
            .map(|idx| {
                rows.column_name(idx)
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("column{}", idx))
            })
            .collect();

        let cap = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut out = Vec::with_capacity(cap.min(1024));

        while out.len() < cap {
            let Some(row) = rows.next().await.map_err(query_error)? else {
                break;
            };

            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row.get_value(idx as i32).map_err(query_error)?;
                record.insert(name.clone(), to_json(value));
            }
            out.push(record);
        }

        debug!(rows = out.len(), limit, "Fetched view rows");
        Ok(out)
    }

    fn describe(&self) -> String {
        format!("libsql view {}", self.view_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::assert_err;

    async fn seeded_db(rows: usize) -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Builder::new_local(dir.path().join("view.db"))
            .build()
            .await
            .unwrap();

        let conn = db.connect().unwrap();
        conn.execute_batch(
            "CREATE TABLE players (id INTEGER PRIMARY KEY, name TEXT, vorp REAL, avatar BLOB);
             CREATE VIEW VORP_Latest AS SELECT id, name, vorp, avatar FROM players;",
        )
        .await
        .unwrap();

        for i in 0..rows {
            conn.execute(
                "INSERT INTO players (id, name, vorp, avatar) VALUES (?1, ?2, ?3, ?4)",
                libsql::params![i as i64, format!("player-{}", i), i as f64 * 0.5, vec![0xABu8, i as u8]],
            )
            .await
            .unwrap();
        }

        (dir, db)
    }

    #[tokio::test]
    async fn test_fetch_respects_limit() {
        let (_dir, db) = seeded_db(25).await;
        let source = LibsqlSource::from_database(db, "VORP_Latest").unwrap();

        assert_eq!(source.fetch(10).await.unwrap().len(), 10);
        assert_eq!(source.fetch(25).await.unwrap().len(), 25);
        assert_eq!(source.fetch(100).await.unwrap().len(), 25);
        assert!(source.fetch(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_maps_columns_and_scalars() {
        let (_dir, db) = seeded_db(3).await;
        let source = LibsqlSource::from_database(db, "VORP_Latest").unwrap();

        let rows = source.fetch(3).await.unwrap();
        let first = rows.iter().find(|r| r["id"] == 1).unwrap();

        let columns: Vec<&str> = first.keys().map(String::as_str).collect();
        assert_eq!(columns, ["id", "name", "vorp", "avatar"]);
        assert_eq!(first["name"], "player-1");
        assert_eq!(first["vorp"], 0.5);
        assert_eq!(first["avatar"], "ab01");
    }

    #[tokio::test]
    async fn test_null_values() {
        let (_dir, db) = seeded_db(0).await;
        db.connect()
            .unwrap()
            .execute("INSERT INTO players (id) VALUES (7)", ())
            .await
            .unwrap();
        let source = LibsqlSource::from_database(db, "VORP_Latest").unwrap();

        let rows = source.fetch(5).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0]["name"].is_null());
        assert!(rows[0]["vorp"].is_null());
    }

    #[tokio::test]
    async fn test_missing_view_is_database_error() {
        let (_dir, db) = seeded_db(1).await;
        let source = LibsqlSource::from_database(db, "No_Such_View").unwrap();

        let err = assert_err!(source.fetch(10).await);
        assert!(matches!(err, ViewgateError::Database(_)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_rejects_injected_view_name() {
        let (_dir, db) = seeded_db(1).await;
        let result = LibsqlSource::from_database(db, "VORP_Latest; DROP TABLE players");
        assert!(matches!(result, Err(ViewgateError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_remote_detection() {
        assert!(SourceConfig::new("libsql://db.turso.io", "v").is_remote());
        assert!(SourceConfig::new("https://db.example.com", "v").is_remote());
        assert!(!SourceConfig::new("file:data/view.db", "v").is_remote());
        assert!(!SourceConfig::new("data/view.db", "v").is_remote());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = SourceConfig::new("libsql://db.turso.io", "v").with_auth_token("s3cret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_to_json_scalars() {
        assert_eq!(to_json(SqlValue::Integer(-4)), Value::from(-4));
        assert_eq!(to_json(SqlValue::Real(f64::NAN)), Value::Null);
        assert_eq!(to_json(SqlValue::Blob(vec![0, 255])), Value::from("00ff"));
    }
}
