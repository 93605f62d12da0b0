//! Domain types for viewgate.

use serde_json::{Map, Value};

use crate::constants::MAX_IDENTIFIER_LEN;
use crate::error::{Result, ViewgateError};

/// One row of a view: column name to scalar value.
///
/// The shape is whatever the view returns at query time; nothing here
/// validates or reshapes it. Column order is preserved.
pub type Row = Map<String, Value>;

/// Builds a row from `(column, value)` pairs.
pub fn row_from_pairs<K, I>(pairs: I) -> Row
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Checks that `name` is a plain SQL identifier.
///
/// Identifiers cannot be bound as query parameters, so the view name is the
/// one piece of query text that comes from configuration. Only
/// `[A-Za-z_][A-Za-z0-9_]*` is accepted.
pub fn validate_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);

    if !valid_start
        || name.len() > MAX_IDENTIFIER_LEN
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ViewgateError::InvalidIdentifier(name.to_string()));
    }

    Ok(name)
}
