pub mod ttl_cache;
pub mod types;

pub use ttl_cache::TtlCache;
pub use types::{CacheEntry, CacheStats};

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Shared, read-only snapshot of an upstream JSON body
pub type SharedPayload = Arc<Value>;

/// The cache pools owned by the relay, one per content class lifetime.
///
/// `responses` holds fixture lists, per-fixture detail and searches;
/// `teams` holds long-lived team metadata.
pub struct CachePools {
    pub responses: TtlCache<SharedPayload>,
    pub teams: TtlCache<SharedPayload>,
}

impl CachePools {
    pub fn new(capacity: usize) -> Self {
        Self {
            responses: TtlCache::new("responses", capacity),
            teams: TtlCache::new("teams", capacity),
        }
    }

    /// Sweeps expired entries from every pool
    pub async fn purge_expired(&self) -> usize {
        self.responses.purge_expired().await + self.teams.purge_expired().await
    }

    /// Clears all cache pools
    pub async fn clear_all(&self) {
        self.responses.clear().await;
        self.teams.clear().await;
        info!("All caches cleared");
    }

    pub async fn stats(&self) -> Vec<CacheStats> {
        vec![self.responses.stats().await, self.teams.stats().await]
    }

    /// Starts the periodic sweep of expired entries
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let swept = self.purge_expired().await;
                debug!("Cache sweep finished: {} expired entries removed", swept);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_pools_are_independent() {
        let pools = CachePools::new(10);
        pools
            .responses
            .set(
                "fixtures?date=2024-01-15".to_string(),
                Arc::new(json!({"response": []})),
                Duration::from_secs(600),
            )
            .await;
        pools
            .teams
            .set(
                "team-33".to_string(),
                Arc::new(json!({"team": {"id": 33}})),
                Duration::from_secs(604_800),
            )
            .await;

        tokio::time::advance(Duration::from_secs(601)).await;
        assert_eq!(pools.purge_expired().await, 1);
        assert!(pools.teams.get("team-33").await.is_some());

        let stats = pools.stats().await;
        assert_eq!(stats[0].entries, 0);
        assert_eq!(stats[1].entries, 1);

        pools.clear_all().await;
        assert!(pools.teams.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_entries() {
        let pools = Arc::new(CachePools::new(10));
        pools
            .responses
            .set("k".to_string(), Arc::new(json!({})), Duration::from_secs(5))
            .await;

        let handle = Arc::clone(&pools).spawn_sweeper(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(pools.responses.len().await, 0);
        handle.abort();
    }
}
