use reqwest::Client;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::fetch_utils::fetch_json;
use super::http_client::create_http_client_with_timeout;
use super::team_aliases;
use super::urls::{EndpointClass, build_endpoint_url, cache_key, team_cache_key};
use crate::config::Config;
use crate::constants::search::MIN_QUERY_CHARS;
use crate::data_fetcher::cache::{CachePools, SharedPayload};
use crate::data_fetcher::rate_governor::RateGovernor;
use crate::error::AppError;

/// Per-call switches for [`UpstreamClient::fetch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Read through the cache and store fresh results in it
    pub use_cache: bool,
    /// Skip the rate governor (trusted local callers only)
    pub bypass_quota: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            bypass_quota: false,
        }
    }
}

impl FetchOptions {
    /// Always hit the upstream and leave the cache untouched
    pub fn fresh() -> Self {
        Self {
            use_cache: false,
            bypass_quota: false,
        }
    }

    pub fn with_bypass(self, bypass_quota: bool) -> Self {
        Self {
            bypass_quota,
            ..self
        }
    }
}

/// Where a payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    Cache,
    Upstream,
    /// Built locally without asking the provider
    Local,
    /// The provider could not be reached or answered with an error
    Unavailable,
}

/// An upstream JSON body together with its provenance.
///
/// An unavailable payload means "temporarily unavailable", never "confirmed
/// empty": callers must not treat it as an empty dataset.
#[derive(Debug, Clone)]
pub struct ApiPayload {
    body: SharedPayload,
    source: PayloadSource,
}

impl ApiPayload {
    pub fn new(body: SharedPayload, source: PayloadSource) -> Self {
        Self { body, source }
    }

    pub fn unavailable() -> Self {
        Self::new(
            Arc::new(Value::Object(Map::new())),
            PayloadSource::Unavailable,
        )
    }

    /// A genuinely empty result produced without an upstream call
    pub fn empty_list() -> Self {
        Self::new(Arc::new(json!({ "response": [] })), PayloadSource::Local)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn shared_body(&self) -> SharedPayload {
        Arc::clone(&self.body)
    }

    pub fn source(&self) -> PayloadSource {
        self.source
    }

    pub fn is_unavailable(&self) -> bool {
        self.source == PayloadSource::Unavailable
    }

    /// The `response` array, or an empty slice when the field is missing
    pub fn response_items(&self) -> &[Value] {
        self.body
            .get("response")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_items(&self) -> bool {
        !self.response_items().is_empty()
    }
}

/// Cache-first client for the metered fixtures API.
///
/// Every call that reaches the network costs one unit of the shared
/// [`RateGovernor`] unless explicitly bypassed; cache hits cost nothing.
pub struct UpstreamClient {
    http: Client,
    base_url: String,
    api_key: String,
    caches: Arc<CachePools>,
    governor: Arc<RateGovernor>,
    /// Cache misses currently being fetched, keyed like the response cache
    in_flight: Mutex<HashMap<String, InFlight>>,
}

type InFlight = Arc<OnceCell<ApiPayload>>;

impl UpstreamClient {
    pub fn new(
        config: &Config,
        caches: Arc<CachePools>,
        governor: Arc<RateGovernor>,
    ) -> Result<Self, AppError> {
        let api_key = config.require_api_key()?;
        let http = create_http_client_with_timeout(config.http_timeout_seconds)?;
        Ok(Self::with_client(
            http,
            &config.api_base_url,
            api_key,
            caches,
            governor,
        ))
    }

    pub fn with_client(
        http: Client,
        base_url: &str,
        api_key: &str,
        caches: Arc<CachePools>,
        governor: Arc<RateGovernor>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            caches,
            governor,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn caches(&self) -> &Arc<CachePools> {
        &self.caches
    }

    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.governor
    }

    /// Fetches `endpoint` with `params`, reading through the response cache.
    ///
    /// Concurrent cache misses for the same key share a single upstream call:
    /// the first caller fetches, the others wait for its payload.
    ///
    /// The only error returned is [`AppError::QuotaExceeded`]; every other
    /// failure is logged and turned into [`ApiPayload::unavailable`], which is
    /// never cached.
    #[instrument(skip(self, params), fields(endpoint = %endpoint))]
    pub async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        options: FetchOptions,
    ) -> Result<ApiPayload, AppError> {
        let key = cache_key(endpoint, params);

        if !options.use_cache {
            return self.fetch_upstream(endpoint, params, key, options).await;
        }

        if let Some(body) = self.caches.responses.get(&key).await {
            debug!("Serving {} from cache", key);
            return Ok(ApiPayload::new(body, PayloadSource::Cache));
        }

        let slot = self.join_in_flight(&key);
        let result = slot
            .get_or_try_init(|| self.fetch_upstream(endpoint, params, key.clone(), options))
            .await
            .cloned();
        self.leave_in_flight(&key, &slot);
        result
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, HashMap<String, InFlight>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn join_in_flight(&self, key: &str) -> InFlight {
        let mut pending = self.pending();
        if let Some(slot) = pending.get(key) {
            debug!("Waiting on in-flight fetch of {}", key);
            return Arc::clone(slot);
        }
        let slot = InFlight::default();
        pending.insert(key.to_string(), Arc::clone(&slot));
        slot
    }

    /// Drops the in-flight entry once it holds a payload, or once no other
    /// caller is left waiting on an entry a refused fetch left empty.
    fn leave_in_flight(&self, key: &str, slot: &InFlight) {
        let mut pending = self.pending();
        let Some(current) = pending.get(key) else {
            return;
        };
        // One reference in the map plus the caller's own
        let unused = Arc::strong_count(current) <= 2;
        if Arc::ptr_eq(current, slot) && (slot.initialized() || unused) {
            pending.remove(key);
        }
    }

    async fn fetch_upstream(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        key: String,
        options: FetchOptions,
    ) -> Result<ApiPayload, AppError> {
        if options.bypass_quota {
            debug!("Quota check bypassed for {}", key);
        } else {
            self.governor.try_acquire()?;
        }

        let url = build_endpoint_url(&self.base_url, endpoint);
        info!("Fetching {} from upstream", key);

        match fetch_json(&self.http, &url, &self.api_key, params).await {
            Ok(body) => {
                let body: SharedPayload = Arc::new(body);
                if options.use_cache {
                    let ttl = EndpointClass::for_endpoint(endpoint).ttl();
                    self.caches
                        .responses
                        .set(key, Arc::clone(&body), ttl)
                        .await;
                }
                Ok(ApiPayload::new(body, PayloadSource::Upstream))
            }
            Err(e) => {
                warn!(
                    "Upstream request for {} failed (retryable: {}): {}",
                    endpoint,
                    e.is_retryable(),
                    e
                );
                Ok(ApiPayload::unavailable())
            }
        }
    }

    /// Fixtures scheduled on `date` (`YYYY-MM-DD`)
    pub async fn fixtures_by_date(
        &self,
        date: &str,
        options: FetchOptions,
    ) -> Result<ApiPayload, AppError> {
        self.fetch("fixtures", &[("date", date)], options).await
    }

    pub async fn fixture_events(
        &self,
        fixture_id: i64,
        options: FetchOptions,
    ) -> Result<ApiPayload, AppError> {
        let id = fixture_id.to_string();
        self.fetch("fixtures/events", &[("fixture", &id)], options)
            .await
    }

    pub async fn fixture_lineups(
        &self,
        fixture_id: i64,
        options: FetchOptions,
    ) -> Result<ApiPayload, AppError> {
        let id = fixture_id.to_string();
        self.fetch("fixtures/lineups", &[("fixture", &id)], options)
            .await
    }

    pub async fn fixture_statistics(
        &self,
        fixture_id: i64,
        options: FetchOptions,
    ) -> Result<ApiPayload, AppError> {
        let id = fixture_id.to_string();
        self.fetch("fixtures/statistics", &[("fixture", &id)], options)
            .await
    }

    /// Team metadata from the long-lived `teams` pool.
    ///
    /// Returns the first `response` item, or `{}` when the provider knows no
    /// such team. Unavailable results are passed through uncached.
    #[instrument(skip(self))]
    pub async fn fetch_team_details(
        &self,
        team_id: i64,
        options: FetchOptions,
    ) -> Result<ApiPayload, AppError> {
        let key = team_cache_key(team_id);

        if options.use_cache
            && let Some(team) = self.caches.teams.get(&key).await
        {
            debug!("Serving team {} from cache", team_id);
            return Ok(ApiPayload::new(team, PayloadSource::Cache));
        }

        let id = team_id.to_string();
        let payload = self
            .fetch(
                "teams",
                &[("id", &id)],
                FetchOptions {
                    use_cache: false,
                    ..options
                },
            )
            .await?;
        if payload.is_unavailable() {
            return Ok(payload);
        }

        let team: SharedPayload = Arc::new(
            payload
                .response_items()
                .first()
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
        );
        if options.use_cache {
            self.caches
                .teams
                .set(key, Arc::clone(&team), EndpointClass::TeamMetadata.ttl())
                .await;
            info!("Team {} cached", team_id);
        }
        Ok(ApiPayload::new(team, PayloadSource::Upstream))
    }

    /// Searches teams by name. Queries shorter than the minimum length are
    /// answered locally with an empty list and cost no quota.
    pub async fn search_teams(
        &self,
        query: &str,
        options: FetchOptions,
    ) -> Result<ApiPayload, AppError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            debug!("Search query '{}' too short, skipping upstream", query);
            return Ok(ApiPayload::empty_list());
        }
        let term = team_aliases::search_term(query);
        if term != query {
            debug!("Mapped search query '{}' to '{}'", query, term);
        }
        self.fetch("teams", &[("search", term)], options).await
    }

    /// Cheap probe used to verify the API key works
    pub async fn check_api_key(&self, options: FetchOptions) -> Result<ApiPayload, AppError> {
        self.fetch("countries", &[], options).await
    }
}
