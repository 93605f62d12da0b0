//! TTL snapshot cache for viewgate.
//!
//! One slot holding the latest view snapshot, refreshed lazily when it
//! expires, with concurrent refreshes collapsed into a single fetch.

mod cache;

pub use cache::{CacheConfig, CacheStats, Snapshot, ViewCache};
