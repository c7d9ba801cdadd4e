//! Generic key/value store with per-entry expiry

use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

use super::types::{CacheEntry, CacheStats};

/// String-keyed cache whose entries expire individually.
///
/// Expired entries are never returned: they are evicted lazily when read and
/// in bulk by [`TtlCache::purge_expired`]. The LRU capacity is only a memory
/// ceiling; under normal load entries leave through expiry, not eviction.
pub struct TtlCache<V> {
    name: &'static str,
    entries: RwLock<LruCache<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Retrieves a value if present and not expired
    #[instrument(skip(self), fields(cache = self.name))]
    pub async fn get(&self, key: &str) -> Option<V> {
        // LRU lookups update recency, so even reads need the write lock
        let mut cache = self.entries.write().await;

        let expired = match cache.get(key) {
            Some(entry) if !entry.is_expired() => {
                trace!(
                    "Cache hit: key={}, remaining={:?}",
                    key,
                    entry.time_until_expiry()
                );
                return Some(entry.value.clone());
            }
            Some(entry) => {
                debug!(
                    "Removing expired cache entry: key={}, age={:?}, ttl={:?}",
                    key,
                    entry.stored_at.elapsed(),
                    entry.ttl
                );
                true
            }
            None => false,
        };

        if expired {
            cache.pop(key);
        } else {
            trace!("Cache miss: key={}", key);
        }

        None
    }

    /// Stores a value, replacing any previous entry and restarting its clock
    #[instrument(skip(self, value), fields(cache = self.name))]
    pub async fn set(&self, key: String, value: V, ttl: Duration) {
        let mut cache = self.entries.write().await;
        if let Some((evicted, _)) = cache.push(key.clone(), CacheEntry::new(value, ttl))
            && evicted != key
        {
            debug!("Cache at capacity, evicted least recently used key={}", evicted);
        }
        debug!("Cached entry: key={}, ttl={:?}", key, ttl);
    }

    /// Removes every expired entry and returns how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let mut cache = self.entries.write().await;
        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            cache.pop(key);
        }

        if !expired.is_empty() {
            debug!(
                "Swept {} expired entries from {} cache",
                expired.len(),
                self.name
            );
        }
        expired.len()
    }

    /// Number of stored entries, expired ones included until swept
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let cache = self.entries.read().await;
        CacheStats {
            name: self.name,
            entries: cache.len(),
            capacity: cache.cap().get(),
        }
    }
}
