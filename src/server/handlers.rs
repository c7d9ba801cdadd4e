use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::AppState;
use super::middleware::{Peer, QuotaBypass};
use crate::data_fetcher::api::date_logic::{current_season, resolve_query_date};
use crate::data_fetcher::api::{ApiPayload, FetchOptions, ScheduleQuery};
use crate::error::AppError;
use crate::notifications::{PushSubscription, Subscriber};

/// Maps an unavailable payload to 503 and passes anything else through
fn payload_json(payload: ApiPayload) -> Result<Json<Value>, AppError> {
    if payload.is_unavailable() {
        return Err(AppError::DataUnavailable);
    }
    Ok(Json(payload.body().clone()))
}

fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::bad_request(format!("Invalid {what} id '{raw}'")))
}

fn options(bypass: QuotaBypass) -> FetchOptions {
    FetchOptions::default().with_bypass(bypass.0)
}

#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    pub date: Option<String>,
}

pub async fn matches(
    State(state): State<AppState>,
    bypass: QuotaBypass,
    Query(query): Query<MatchesQuery>,
) -> Result<Json<Value>, AppError> {
    let date = resolve_query_date(query.date.as_deref())?;
    let payload = state.client.fixtures_by_date(&date, options(bypass)).await?;
    payload_json(payload)
}

pub async fn match_events(
    State(state): State<AppState>,
    bypass: QuotaBypass,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "fixture")?;
    payload_json(state.client.fixture_events(id, options(bypass)).await?)
}

pub async fn match_lineups(
    State(state): State<AppState>,
    bypass: QuotaBypass,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "fixture")?;
    payload_json(state.client.fixture_lineups(id, options(bypass)).await?)
}

pub async fn match_statistics(
    State(state): State<AppState>,
    bypass: QuotaBypass,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "fixture")?;
    payload_json(state.client.fixture_statistics(id, options(bypass)).await?)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn search_teams(
    State(state): State<AppState>,
    bypass: QuotaBypass,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, AppError> {
    let q = query.q.unwrap_or_default();
    payload_json(state.client.search_teams(&q, options(bypass)).await?)
}

pub async fn team_details(
    State(state): State<AppState>,
    bypass: QuotaBypass,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "team")?;
    payload_json(state.client.fetch_team_details(id, options(bypass)).await?)
}

#[derive(Debug, Deserialize)]
pub struct ScheduleParams {
    pub team: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<String>,
}

fn optional_date(value: Option<String>) -> Result<Option<String>, AppError> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => resolve_query_date(Some(&v)).map(Some),
        None => Ok(None),
    }
}

pub async fn team_schedule(
    State(state): State<AppState>,
    bypass: QuotaBypass,
    Query(params): Query<ScheduleParams>,
) -> Result<Json<Value>, AppError> {
    let team = params
        .team
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Team ID is required"))?;
    let query = ScheduleQuery {
        team: parse_id(&team, "team")?,
        date: optional_date(params.date)?,
        from: optional_date(params.from)?,
        to: optional_date(params.to)?,
    };

    let payload = state
        .client
        .team_schedule(&query, current_season(), options(bypass))
        .await?;
    info!(
        "Team {} schedule: {} fixtures",
        query.team,
        payload.response_items().len()
    );
    payload_json(payload)
}

pub async fn test_key(
    State(state): State<AppState>,
    bypass: QuotaBypass,
) -> Result<Response, AppError> {
    let payload = state.client.check_api_key(options(bypass)).await?;
    if payload.is_unavailable() {
        warn!("API key check failed: upstream unavailable or key rejected");
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "apiKeyValid": false,
                "error": "data temporarily unavailable",
            })),
        )
            .into_response());
    }

    let items = payload.response_items();
    Ok(Json(json!({
        "apiKeyValid": true,
        "countriesCount": items.len(),
        "sampleData": items.iter().take(3).collect::<Vec<_>>(),
    }))
    .into_response())
}

pub async fn quota(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "quota": state.client.governor().snapshot(),
        "caches": state.client.caches().stats().await,
        "subscribers": state.dispatcher.registry().len().await,
        "pendingRetries": state.dispatcher.pending_retries(),
    }))
}

pub async fn vapid_public(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "publicKey": state.vapid_public_key.as_ref() }))
}

/// Team ids may arrive as numbers or numeric strings; anything else is dropped
fn favorite_ids(value: Option<&Value>) -> Vec<i64> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect()
}

pub async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let subscription = body
        .get("subscription")
        .filter(|s| {
            s.get("endpoint")
                .and_then(Value::as_str)
                .is_some_and(|e| !e.trim().is_empty())
        })
        .ok_or_else(|| AppError::bad_request("Subscription required"))?;

    let subscription: PushSubscription = serde_json::from_value(subscription.clone())
        .map_err(|e| AppError::bad_request(format!("Invalid subscription: {e}")))?;
    let favorites = favorite_ids(body.get("favoriteTeamIds"));

    state
        .dispatcher
        .registry()
        .upsert(Subscriber::new(subscription, favorites))
        .await;
    Ok(Json(json!({ "ok": true })))
}

pub async fn cron_notify(
    State(state): State<AppState>,
    peer: Peer,
) -> Result<Json<Value>, AppError> {
    if !peer.is_loopback() {
        warn!("Refused cron-notify from {:?}", peer.0);
        return Err(AppError::forbidden("cron-notify is only available locally"));
    }

    let outcome = state.job.run_once().await;
    Ok(Json(json!({
        "ok": true,
        "message": "Notifications job executed",
        "outcome": outcome,
    })))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("1035037", "fixture").unwrap(), 1_035_037);
        assert!(matches!(parse_id("abc", "fixture"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_id("-4", "team"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_favorite_ids_accepts_numbers_and_strings() {
        let body = json!({"favoriteTeamIds": [33, "40", "x", null, 2.5]});
        assert_eq!(favorite_ids(body.get("favoriteTeamIds")), vec![33, 40]);
        assert!(favorite_ids(Some(&json!("33"))).is_empty());
        assert!(favorite_ids(None).is_empty());
    }

    #[test]
    fn test_optional_date() {
        assert_eq!(optional_date(None).unwrap(), None);
        assert_eq!(optional_date(Some(" ".to_string())).unwrap(), None);
        assert_eq!(
            optional_date(Some("2025-08-01".to_string())).unwrap(),
            Some("2025-08-01".to_string())
        );
        assert!(optional_date(Some("tomorrow".to_string())).is_err());
    }
}
