//! Single-slot TTL cache over a [`ViewSource`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use viewgate_core::constants::{DEFAULT_CACHE_TTL_SECS, PRELOAD_LIMIT};
use viewgate_core::error::Result;
use viewgate_core::traits::ViewSource;
use viewgate_core::types::Row;

/// Cache configuration.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Snapshot TTL in seconds
    pub ttl_seconds: u64,
    /// Rows fetched by [`ViewCache::preload`]
    pub preload_limit: u32,
    /// Serve an expired snapshot when a refresh fails
    pub serve_stale_on_error: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_CACHE_TTL_SECS,
            preload_limit: PRELOAD_LIMIT,
            serve_stale_on_error: false,
        }
    }
}

impl CacheConfig {
    /// Snapshot TTL as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Expiry for a snapshot fetched at `fetched_at`. A TTL past what the
    /// clock can represent never expires.
    fn expiry(&self, fetched_at: Instant) -> Instant {
        fetched_at
            .checked_add(self.ttl())
            .unwrap_or_else(|| fetched_at + NEVER_EXPIRES)
    }
}

/// Stand-in for an unrepresentable expiry, roughly thirty years out.
const NEVER_EXPIRES: Duration = Duration::from_secs(86_400 * 365 * 30);

/// One immutable fetch result.
///
/// Published by swapping an `Arc`, so a reader holds either the whole old
/// snapshot or the whole new one.
#[derive(Debug)]
pub struct Snapshot {
    rows: Arc<[Row]>,
    fetched_limit: u32,
    fetched_at: Instant,
    expires_at: Instant,
}

impl Snapshot {
    /// Rows in the order the source returned them.
    pub fn rows(&self) -> &Arc<[Row]> {
        &self.rows
    }

    /// Number of rows held.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the source returned no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Limit the source was queried with.
    pub fn fetched_limit(&self) -> u32 {
        self.fetched_limit
    }

    /// Time since the fetch completed.
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// Returns true once the TTL has run out.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// A short snapshot already holds every row the view had, so it covers
    /// any limit. A full one only covers limits up to what was fetched.
    fn covers(&self, limit: u32) -> bool {
        limit <= self.fetched_limit || self.rows.len() < self.fetched_limit as usize
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    refreshes: AtomicU64,
    failed_refreshes: AtomicU64,
    stale_served: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses answered by a refresh another caller had just finished
    pub coalesced: u64,
    pub refreshes: u64,
    pub failed_refreshes: u64,
    pub stale_served: u64,
    pub cached_rows: Option<usize>,
    pub snapshot_age_seconds: Option<u64>,
}

/// TTL cache holding one snapshot of a view.
///
/// Reads never wait on the database while a fresh snapshot exists. On a
/// miss, callers queue on a refresh gate; the first one fetches and the
/// rest pick up its snapshot, so an expiry costs one query no matter how
/// many requests arrive at once. The slot lock is never held across a
/// fetch.
pub struct ViewCache {
    source: Arc<dyn ViewSource>,
    config: CacheConfig,
    slot: RwLock<Option<Arc<Snapshot>>>,
    refresh_gate: Mutex<()>,
    counters: Counters,
}

impl ViewCache {
    /// Creates an empty cache in front of `source`.
    pub fn new(source: impl ViewSource + 'static, config: CacheConfig) -> Self {
        Self::from_arc(Arc::new(source), config)
    }

    /// Creates an empty cache in front of a shared source.
    pub fn from_arc(source: Arc<dyn ViewSource>, config: CacheConfig) -> Self {
        Self {
            source,
            config,
            slot: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            counters: Counters::default(),
        }
    }

    /// Fills the slot with the fixed preload limit.
    ///
    /// Meant to run once before the server accepts traffic. Returns the
    /// number of rows loaded.
    pub async fn preload(&self) -> Result<usize> {
        let _gate = self.refresh_gate.lock().await;
        let snapshot = self.refresh_locked(self.config.preload_limit).await?;

        info!(
            rows = snapshot.len(),
            source = %self.source.describe(),
            ttl_seconds = self.config.ttl_seconds,
            "Preloaded view cache"
        );
        Ok(snapshot.len())
    }

    /// Returns rows valid for a request of `limit`, refreshing if needed.
    ///
    /// The result may hold more than `limit` rows; callers truncate. A
    /// refresh queries `max(limit, preload_limit)` rows. Source errors are
    /// returned as-is and leave the previous snapshot in place.
    pub async fn get(&self, limit: u32) -> Result<Arc<[Row]>> {
        if let Some(snapshot) = self.fresh_snapshot(limit) {
            Counters::bump(&self.counters.hits);
            return Ok(snapshot.rows.clone());
        }
        Counters::bump(&self.counters.misses);

        let _gate = self.refresh_gate.lock().await;

        if let Some(snapshot) = self.fresh_snapshot(limit) {
            Counters::bump(&self.counters.coalesced);
            return Ok(snapshot.rows.clone());
        }

        let fetch_limit = limit.max(self.config.preload_limit);
        match self.refresh_locked(fetch_limit).await {
            Ok(snapshot) => Ok(snapshot.rows.clone()),
            Err(err) => match self.stale_fallback() {
                Some(stale) => {
                    warn!(
                        error = %err,
                        age_seconds = stale.age().as_secs(),
                        "Refresh failed, serving stale snapshot"
                    );
                    Counters::bump(&self.counters.stale_served);
                    Ok(stale.rows.clone())
                }
                None => Err(err),
            },
        }
    }

    /// Current snapshot, expired or not.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.slot.read().clone()
    }

    /// Drops the current snapshot; the next read refetches.
    pub fn invalidate(&self) {
        *self.slot.write() = None;
        debug!("View cache invalidated");
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let snapshot = self.snapshot();
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);

        CacheStats {
            hits: load(&self.counters.hits),
            misses: load(&self.counters.misses),
            coalesced: load(&self.counters.coalesced),
            refreshes: load(&self.counters.refreshes),
            failed_refreshes: load(&self.counters.failed_refreshes),
            stale_served: load(&self.counters.stale_served),
            cached_rows: snapshot.as_ref().map(|s| s.len()),
            snapshot_age_seconds: snapshot.as_ref().map(|s| s.age().as_secs()),
        }
    }

    fn fresh_snapshot(&self, limit: u32) -> Option<Arc<Snapshot>> {
        let now = Instant::now();
        self.slot
            .read()
            .as_ref()
            .filter(|s| now < s.expires_at && s.covers(limit))
            .cloned()
    }

    fn stale_fallback(&self) -> Option<Arc<Snapshot>> {
        if self.config.serve_stale_on_error {
            self.snapshot()
        } else {
            None
        }
    }

    /// Fetches and publishes a new snapshot. Caller holds the refresh gate.
    async fn refresh_locked(&self, limit: u32) -> Result<Arc<Snapshot>> {
        let started = Instant::now();

        let rows = match self.source.fetch(limit).await {
            Ok(rows) => rows,
            Err(err) => {
                Counters::bump(&self.counters.failed_refreshes);
                warn!(error = %err, limit, "View refresh failed");
                return Err(err);
            }
        };

        let fetched_at = Instant::now();
        let snapshot = Arc::new(Snapshot {
            rows: rows.into(),
            fetched_limit: limit,
            fetched_at,
            expires_at: self.config.expiry(fetched_at),
        });

        *self.slot.write() = Some(snapshot.clone());
        Counters::bump(&self.counters.refreshes);

        debug!(
            rows = snapshot.len(),
            limit,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "View snapshot refreshed"
        );
        Ok(snapshot)
    }
}
