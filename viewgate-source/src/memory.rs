//! In-memory view source.
//!
//! Fixed rows held in process, for development and testing. Counts every
//! fetch and can be told to fail, which makes cache behaviour observable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use viewgate_core::error::{Result, ViewgateError};
use viewgate_core::traits::ViewSource;
use viewgate_core::types::Row;

/// In-memory view source.
///
/// All operations are thread-safe and can be called concurrently.
#[derive(Debug, Default)]
pub struct MemorySource {
    /// Rows in "natural" order
    rows: RwLock<Vec<Row>>,
    /// Fetch attempts, failed ones included
    fetches: AtomicU64,
    /// When set, every fetch fails with this message
    failure: RwLock<Option<String>>,
    /// Simulated query latency
    latency: Option<Duration>,
}

impl MemorySource {
    /// Creates a source serving `rows`.
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: RwLock::new(rows),
            ..Self::default()
        }
    }

    /// Adds simulated latency to every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replaces the served rows.
    pub fn set_rows(&self, rows: Vec<Row>) {
        *self.rows.write() = rows;
    }

    /// Makes every subsequent fetch fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write() = Some(message.into());
    }

    /// Clears a failure set by [`fail_with`](Self::fail_with).
    pub fn recover(&self) {
        *self.failure.write() = None;
    }

    /// Number of fetches attempted so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of rows currently served.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if no rows are served.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl ViewSource for MemorySource {
    #[instrument(skip(self))]
    async fn fetch(&self, limit: u32) -> Result<Vec<Row>> {
        let attempt = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self.failure.read().clone();
        if let Some(message) = failure {
            debug!(attempt, "Simulated fetch failure");
            return Err(ViewgateError::Database(message));
        }

        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let rows: Vec<Row> = self.rows.read().iter().take(limit).cloned().collect();

        debug!(attempt, rows = rows.len(), "Fetched in-memory rows");
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("in-memory view ({} rows)", self.len())
    }
}
