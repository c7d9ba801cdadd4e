//! Client-facing JSON API over the relay.

pub mod handlers;
pub mod middleware;

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::data_fetcher::{CachePools, RateGovernor, UpstreamClient};
use crate::error::AppError;
use crate::notifications::{
    DisabledPushService, NotificationDispatcher, NotificationJob, PushService,
    SubscriptionRegistry, WebPushService,
};

/// Shared services handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<UpstreamClient>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub job: Arc<NotificationJob>,
    pub vapid_public_key: Arc<str>,
    pub quota_bypass_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        client: Arc<UpstreamClient>,
        dispatcher: Arc<NotificationDispatcher>,
        vapid_public_key: &str,
        quota_bypass_token: Option<&str>,
    ) -> Self {
        let job = Arc::new(NotificationJob::new(
            Arc::clone(&client),
            Arc::clone(&dispatcher),
        ));
        Self {
            client,
            dispatcher,
            job,
            vapid_public_key: Arc::from(vapid_public_key),
            quota_bypass_token: quota_bypass_token
                .filter(|token| !token.is_empty())
                .map(Arc::from),
        }
    }

    /// Wires caches, quota, upstream client and push delivery from config
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let caches = Arc::new(CachePools::new(config.cache_capacity));
        let governor = Arc::new(RateGovernor::new(
            config.rate_limit_requests,
            Duration::from_secs(config.rate_limit_window_seconds),
        ));
        let client = Arc::new(UpstreamClient::new(config, caches, governor)?);

        let push: Arc<dyn PushService> = match config.vapid_keypair() {
            Some((_, private_key)) => {
                Arc::new(WebPushService::new(private_key, &config.vapid_subject)?)
            }
            None => {
                warn!("VAPID keys not configured, push notifications are disabled");
                Arc::new(DisabledPushService)
            }
        };
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(SubscriptionRegistry::new()),
            push,
        ));

        let public_key = config
            .vapid_keypair()
            .map(|(public_key, _)| public_key)
            .unwrap_or_default();
        Ok(Self::new(
            client,
            dispatcher,
            public_key,
            config.quota_bypass_token.as_deref(),
        ))
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/matches", get(handlers::matches))
        .route("/match/events/{id}", get(handlers::match_events))
        .route("/match/lineups/{id}", get(handlers::match_lineups))
        .route("/match/statistics/{id}", get(handlers::match_statistics))
        .route("/teams/search", get(handlers::search_teams))
        .route("/teams/{id}", get(handlers::team_details))
        .route("/team-schedule", get(handlers::team_schedule))
        .route("/test-key", get(handlers::test_key))
        .route("/quota", get(handlers::quota))
        .route("/push/vapid-public", get(handlers::vapid_public))
        .route("/push/subscribe", post(handlers::subscribe))
        .route("/cron-notify", get(handlers::cron_notify));

    Router::new()
        .nest("/api", api)
        .route("/health", get(handlers::health))
        .layer(axum::middleware::from_fn(middleware::log_errors))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves `router` until Ctrl-C, recording peer addresses for the
/// loopback-only routes.
pub async fn serve(listener: TcpListener, router: Router) -> Result<(), AppError> {
    info!("Server listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}
