use matchday_relay::config::Config;
use matchday_relay::constants::{cache_ttl, notify};
use matchday_relay::error::AppError;
use matchday_relay::server::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// Runs the relay until shutdown.
///
/// - Wires caches, quota, upstream client and push delivery
/// - Starts the cache sweeper and the notification job
/// - Serves the client API on all interfaces
pub async fn run_server(config: Config) -> Result<(), AppError> {
    let state = AppState::from_config(&config)?;

    let _sweeper = Arc::clone(state.client.caches())
        .spawn_sweeper(Duration::from_secs(cache_ttl::SWEEP_INTERVAL_SECONDS));
    let _job = Arc::clone(&state.job).spawn(
        Duration::from_secs(config.notify_interval_seconds),
        Duration::from_secs(notify::INITIAL_DELAY_SECONDS),
    );

    info!(
        "Upstream {} with quota {} requests / {}s, push {}",
        config.api_base_url,
        config.rate_limit_requests,
        config.rate_limit_window_seconds,
        if state.dispatcher.push_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    server::serve(listener, server::create_router(state)).await
}
