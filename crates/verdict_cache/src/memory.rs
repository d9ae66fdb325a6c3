//! In-process tier of the package cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use verdict_common::CacheKey;

struct MemoryEntry<P> {
    package: Arc<P>,
    created_at: Instant,
}

/// Thread-safe map from cache key to a shared, loaded package.
///
/// Entries older than the TTL are treated as absent by [`get`](Self::get)
/// but are left in place until overwritten or cleared. The lock is only
/// held for the map operation itself; callers do all I/O outside it.
pub struct MemoryCache<P> {
    entries: RwLock<HashMap<CacheKey, MemoryEntry<P>>>,
    ttl: Duration,
}

impl<P> MemoryCache<P> {
    /// Creates an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// The configured entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the package for `key` unless it is absent or expired.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<P>> {
        self.get_at(key, Instant::now())
    }

    /// Like [`get`](Self::get), evaluated as if the current time were `now`.
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Arc<P>> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        let age = now.saturating_duration_since(entry.created_at);
        if age > self.ttl {
            return None;
        }
        Some(Arc::clone(&entry.package))
    }

    /// Inserts or replaces the package for `key`, stamped with the current time.
    pub fn put(&self, key: CacheKey, package: Arc<P>) {
        let entry = MemoryEntry {
            package,
            created_at: Instant::now(),
        };
        self.entries.write().insert(key, entry);
    }

    /// Removes the entry for `key`, returning `true` if one was present.
    pub fn remove(&self, key: &CacheKey) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
