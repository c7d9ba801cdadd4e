//! Builders for upstream-shaped JSON and a push service that records
//! deliveries, shared by unit and integration tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Mutex;

use crate::notifications::push::{
    DeliveryError, PushPayload, PushService, PushSubscription, SubscriptionKeys,
};

/// A `fixtures` item with the fields the relay reads
pub fn fixture_json(fixture_id: i64, home: (i64, &str), away: (i64, &str)) -> Value {
    json!({
        "fixture": {
            "id": fixture_id,
            "date": "2024-01-15T20:00:00+00:00",
            "status": {"short": "1H", "elapsed": 23}
        },
        "league": {"id": 39, "name": "Premier League", "season": 2023},
        "teams": {
            "home": {"id": home.0, "name": home.1, "winner": null},
            "away": {"id": away.0, "name": away.1, "winner": null}
        },
        "goals": {"home": null, "away": null}
    })
}

/// A `fixtures/events` item
pub fn event_json(team_id: i64, kind: &str, detail: &str) -> Value {
    json!({
        "time": {"elapsed": 23, "extra": null},
        "team": {"id": team_id, "name": format!("Team {team_id}")},
        "player": {"id": 1, "name": "Player"},
        "type": kind,
        "detail": detail
    })
}

/// `count` normal goals for `team_id`
pub fn goal_events_json(team_id: i64, count: usize) -> Vec<Value> {
    (0..count)
        .map(|_| event_json(team_id, "Goal", "Normal Goal"))
        .collect()
}

/// A `fixtures/lineups` item
pub fn lineup_json(team_id: i64, team_name: &str) -> Value {
    json!({
        "team": {"id": team_id, "name": team_name},
        "formation": "4-3-3",
        "startXI": [],
        "substitutes": []
    })
}

/// Wraps items in the provider's response envelope
pub fn api_response(items: Vec<Value>) -> Value {
    json!({
        "get": "fixtures",
        "errors": [],
        "results": items.len(),
        "response": items
    })
}

/// A subscription whose endpoint is `https://push.example/{name}`
pub fn subscription(name: &str) -> PushSubscription {
    PushSubscription {
        endpoint: format!("https://push.example/{name}"),
        keys: SubscriptionKeys {
            p256dh: format!("p256dh-{name}"),
            auth: format!("auth-{name}"),
        },
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    attempts: usize,
    delivered: Vec<(String, PushPayload)>,
    failing: HashSet<String>,
    gone: HashSet<String>,
}

/// Push service that records every delivery and fails on request
#[derive(Debug, Default)]
pub struct RecordingPushService {
    state: Mutex<RecordingState>,
}

impl RecordingPushService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Deliveries to `endpoint` fail until [`Self::recover`]
    pub fn fail_endpoint(&self, endpoint: &str) {
        self.state().failing.insert(endpoint.to_string());
    }

    /// Deliveries to `endpoint` report the subscription as gone
    pub fn gone_endpoint(&self, endpoint: &str) {
        self.state().gone.insert(endpoint.to_string());
    }

    pub fn recover(&self) {
        let mut state = self.state();
        state.failing.clear();
        state.gone.clear();
    }

    /// Every delivery attempt, successful or not
    pub fn attempts(&self) -> usize {
        self.state().attempts
    }

    /// Endpoints that received a notification, sorted
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = self
            .state()
            .delivered
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect();
        endpoints.sort();
        endpoints
    }

    pub fn delivered_payloads(&self) -> Vec<PushPayload> {
        self.state()
            .delivered
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Payloads delivered to one endpoint, in delivery order
    pub fn delivered_to(&self, endpoint: &str) -> Vec<PushPayload> {
        self.state()
            .delivered
            .iter()
            .filter(|(e, _)| e == endpoint)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl PushService for RecordingPushService {
    async fn deliver(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<(), DeliveryError> {
        let mut state = self.state();
        state.attempts += 1;

        if state.gone.contains(&subscription.endpoint) {
            return Err(DeliveryError::Gone);
        }
        if state.failing.contains(&subscription.endpoint) {
            return Err(DeliveryError::Failed("simulated failure".to_string()));
        }

        let payload: PushPayload = serde_json::from_slice(payload)
            .map_err(|e| DeliveryError::Failed(format!("undecodable payload: {e}")))?;
        state
            .delivered
            .push((subscription.endpoint.clone(), payload));
        Ok(())
    }
}
