//! Cache data structures with TTL support

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// A cached value together with the moment it was stored and its lifetime.
///
/// The entry is visible while `now - stored_at < ttl`.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Creates a new entry stamped with the current time
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
            ttl,
        }
    }

    /// Checks if the entry has outlived its TTL
    pub fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }

    /// Gets the remaining time until expiration
    pub fn time_until_expiry(&self) -> Duration {
        self.ttl.saturating_sub(self.stored_at.elapsed())
    }
}

/// Size information for one cache pool, exposed for monitoring
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub name: &'static str,
    pub entries: usize,
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_visible_until_ttl_elapses() {
        let entry = CacheEntry::new("payload", Duration::from_secs(120));
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_secs(119)).await;
        assert!(!entry.is_expired());
        assert_eq!(entry.time_until_expiry(), Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(entry.is_expired());
        assert_eq!(entry.time_until_expiry(), Duration::ZERO);
    }
}
