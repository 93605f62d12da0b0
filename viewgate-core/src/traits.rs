//! Common traits for viewgate.
//!
//! [`ViewSource`] is the seam between the snapshot cache and whatever
//! actually holds the rows, so the cache can be tested without a database.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Row;

// ═══════════════════════════════════════════════════════════════════════════════
// DATA SOURCE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Bounded, read-only access to a single view.
///
/// Implementations might use:
/// - libSQL / Turso (production)
/// - In-memory rows (testing/development)
#[async_trait]
pub trait ViewSource: Send + Sync {
    /// Reads at most `limit` rows in the view's natural order.
    ///
    /// The result is fully materialised. The limit must reach the backend
    /// as a bound parameter, never as interpolated query text.
    async fn fetch(&self, limit: u32) -> Result<Vec<Row>>;

    /// Short human-readable description of the source, for logs.
    fn describe(&self) -> String;
}

#[async_trait]
impl<S: ViewSource + ?Sized> ViewSource for Arc<S> {
    async fn fetch(&self, limit: u32) -> Result<Vec<Row>> {
        (**self).fetch(limit).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
