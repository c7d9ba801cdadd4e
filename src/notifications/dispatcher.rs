//! Subscriber registry and best-effort fan-out of push notifications.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::push::{DeliveryError, PushPayload, PushService, PushSubscription};
use crate::constants::notify::{MAX_CONCURRENT_DELIVERIES, RETRY_BUFFER_CAPACITY};

/// A push subscription and the teams it wants alerts for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub subscription: PushSubscription,
    #[serde(default)]
    pub favorite_team_ids: BTreeSet<i64>,
}

impl Subscriber {
    pub fn new(
        subscription: PushSubscription,
        favorite_team_ids: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            subscription,
            favorite_team_ids: favorite_team_ids.into_iter().collect(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.subscription.endpoint
    }

    pub fn follows(&self, team_id: i64) -> bool {
        self.favorite_team_ids.contains(&team_id)
    }
}

/// In-memory subscribers keyed by push endpoint.
///
/// Subscribing again from the same endpoint replaces the earlier record.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscribers: RwLock<HashMap<String, Subscriber>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the subscriber for its endpoint.
    /// Returns `true` when an existing record was replaced.
    pub async fn upsert(&self, subscriber: Subscriber) -> bool {
        let endpoint = subscriber.endpoint().to_string();
        let replaced = self
            .subscribers
            .write()
            .await
            .insert(endpoint.clone(), subscriber)
            .is_some();
        if replaced {
            debug!("Updated subscription {}", endpoint);
        } else {
            info!("New push subscription {}", endpoint);
        }
        replaced
    }

    pub async fn remove(&self, endpoint: &str) -> bool {
        self.subscribers.write().await.remove(endpoint).is_some()
    }

    pub async fn get(&self, endpoint: &str) -> Option<Subscriber> {
        self.subscribers.read().await.get(endpoint).cloned()
    }

    pub async fn contains(&self, endpoint: &str) -> bool {
        self.subscribers.read().await.contains_key(endpoint)
    }

    /// Union of every subscriber's favorite teams
    pub async fn favorite_team_ids(&self) -> HashSet<i64> {
        self.subscribers
            .read()
            .await
            .values()
            .flat_map(|s| s.favorite_team_ids.iter().copied())
            .collect()
    }

    pub async fn subscribers_for_team(&self, team_id: i64) -> Vec<Subscriber> {
        self.subscribers
            .read()
            .await
            .values()
            .filter(|s| s.follows(team_id))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }
}

/// Counts from one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub targeted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub removed: usize,
}

impl DispatchReport {
    pub fn merge(&mut self, other: DispatchReport) {
        self.targeted += other.targeted;
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.removed += other.removed;
    }
}

/// A delivery that failed once and waits for its single retry
#[derive(Debug, Clone)]
struct PendingDelivery {
    subscription: PushSubscription,
    payload: Arc<[u8]>,
}

pub struct NotificationDispatcher {
    registry: Arc<SubscriptionRegistry>,
    push: Arc<dyn PushService>,
    retry_buffer: Mutex<VecDeque<PendingDelivery>>,
}

impl NotificationDispatcher {
    pub fn new(registry: Arc<SubscriptionRegistry>, push: Arc<dyn PushService>) -> Self {
        Self {
            registry,
            push,
            retry_buffer: Mutex::new(VecDeque::new()),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn push_enabled(&self) -> bool {
        self.push.is_enabled()
    }

    pub fn pending_retries(&self) -> usize {
        self.lock_retry_buffer().len()
    }

    fn lock_retry_buffer(&self) -> std::sync::MutexGuard<'_, VecDeque<PendingDelivery>> {
        self.retry_buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Delivers `payload` to every subscriber following `team_id`.
    ///
    /// Each delivery stands alone: failures are logged and counted, never
    /// raised. Subscriptions the push service reports as gone are removed;
    /// other failures are parked for one retry on the next run.
    pub async fn notify_team_subscribers(
        &self,
        team_id: i64,
        payload: &PushPayload,
    ) -> DispatchReport {
        let targets: Vec<PushSubscription> = self
            .registry
            .subscribers_for_team(team_id)
            .await
            .into_iter()
            .map(|s| s.subscription)
            .collect();

        if targets.is_empty() {
            debug!("No subscribers follow team {}", team_id);
            return DispatchReport::default();
        }

        let bytes: Arc<[u8]> = match payload.to_bytes() {
            Ok(bytes) => bytes.into(),
            Err(e) => {
                error!("Failed to encode push payload: {}", e);
                return DispatchReport::default();
            }
        };

        let report = self.deliver_all(targets, bytes, true).await;
        info!(
            "Team {} notification '{}': {} targeted, {} delivered, {} failed, {} removed",
            team_id, payload.title, report.targeted, report.delivered, report.failed, report.removed
        );
        report
    }

    /// Re-attempts deliveries that failed during the previous run, once.
    /// Anything that fails again is dropped.
    pub async fn retry_failed(&self) -> DispatchReport {
        let parked: Vec<PendingDelivery> = self.lock_retry_buffer().drain(..).collect();
        if parked.is_empty() {
            return DispatchReport::default();
        }

        let mut report = DispatchReport::default();
        for pending in parked {
            // Unsubscribed or removed since the failure
            if !self.registry.contains(&pending.subscription.endpoint).await {
                continue;
            }
            let single = self
                .deliver_all(vec![pending.subscription], pending.payload, false)
                .await;
            report.merge(single);
        }

        if report.targeted > 0 {
            info!(
                "Retried {} parked deliveries: {} delivered, {} dropped",
                report.targeted, report.delivered, report.failed
            );
        }
        report
    }

    async fn deliver_all(
        &self,
        targets: Vec<PushSubscription>,
        payload: Arc<[u8]>,
        park_failures: bool,
    ) -> DispatchReport {
        let push = Arc::clone(&self.push);
        let outcomes: Vec<(PushSubscription, Result<(), DeliveryError>)> = stream::iter(targets)
            .map(|subscription| {
                let push = Arc::clone(&push);
                let payload = Arc::clone(&payload);
                async move {
                    let result = push.deliver(&subscription, &payload).await;
                    (subscription, result)
                }
            })
            .buffer_unordered(MAX_CONCURRENT_DELIVERIES)
            .collect()
            .await;

        let mut report = DispatchReport {
            targeted: outcomes.len(),
            ..Default::default()
        };

        for (subscription, result) in outcomes {
            match result {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Gone) => {
                    warn!("Removing expired subscription {}", subscription.endpoint);
                    if self.registry.remove(&subscription.endpoint).await {
                        report.removed += 1;
                    }
                }
                Err(DeliveryError::Failed(reason)) => {
                    warn!("Push to {} failed: {}", subscription.endpoint, reason);
                    report.failed += 1;
                    if park_failures {
                        self.park(PendingDelivery {
                            subscription,
                            payload: Arc::clone(&payload),
                        });
                    }
                }
            }
        }

        report
    }

    fn park(&self, pending: PendingDelivery) {
        if !self.push.is_enabled() {
            return;
        }
        let mut buffer = self.lock_retry_buffer();
        if buffer.len() >= RETRY_BUFFER_CAPACITY
            && let Some(dropped) = buffer.pop_front()
        {
            warn!(
                "Retry buffer full, dropping oldest delivery for {}",
                dropped.subscription.endpoint
            );
        }
        buffer.push_back(pending);
    }
}
