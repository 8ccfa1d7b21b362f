//! In-memory key/value cache with per-entry expiry.
//!
//! Used by the server to memoize rendered playlists. The cache never evicts
//! on its own; [`TtlCache::cleanup`] must be called periodically.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::RwLock;

struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL is too large to represent; the entry never expires.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Thread-safe cache where each entry carries its own time-to-live.
pub struct TtlCache<V = Bytes> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or overwrite `key`, expiring `ttl` from now.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Get a live value. Entries at or past their expiry are misses even
    /// before [`cleanup`](Self::cleanup) removes them.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.is_expired(now) {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Remove `key` if present.
    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet cleaned up.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
