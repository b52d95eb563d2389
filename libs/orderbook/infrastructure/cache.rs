//! Time-to-live result cache
//!
//! Explicit memoization object owned by whoever issues the queries. Each
//! entry remembers when it was fetched; an entry older than the TTL is
//! treated as absent and replaced on the next insert.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cached value together with its fetch time
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.fetched_at) < ttl
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Map of key → value with a fixed time-to-live
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
    stats: CacheStats,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            stats: CacheStats::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, or `None` if missing or expired
    pub fn get(&mut self, key: &K) -> Option<&CacheEntry<V>> {
        let now = Instant::now();
        let ttl = self.ttl;

        match self.entries.get(key) {
            Some(entry) if entry.is_fresh(ttl, now) => {
                self.stats.hits += 1;
                self.entries.get(key)
            }
            _ => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store a value fetched just now
    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Store a value whose query was issued at `fetched_at`
    pub fn insert_at(&mut self, key: K, value: V, fetched_at: Instant) {
        self.entries.insert(key, CacheEntry { value, fetched_at });
    }

    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every expired entry
    pub fn purge_expired(&mut self) {
        let now = Instant::now();
        let ttl = self.ttl;
        let before = self.entries.len();

        self.entries.retain(|_, entry| entry.is_fresh(ttl, now));

        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("[Cache] Purged {} expired entries", removed);
        }
    }

    /// Number of stored entries, fresh or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
