use axum::{
    body::{Body, to_bytes},
    extract::{ConnectInfo, FromRequestParts},
    middleware::Next,
    response::Response,
};
use http::{Request, request::Parts};
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{debug, error, warn};

use super::AppState;
use crate::constants::QUOTA_BYPASS_HEADER;

/// Largest error body copied into the log
const MAX_LOGGED_BODY_BYTES: usize = 1024;

/// Logs the body of every 5xx response before passing it on unchanged
pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;

    if !response.status().is_server_error() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read error response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let logged = &bytes[..bytes.len().min(MAX_LOGGED_BODY_BYTES)];
    error!(
        "{} {} failed - Status: {}, Body: {}{}",
        method,
        uri,
        parts.status,
        String::from_utf8_lossy(logged),
        if logged.len() < bytes.len() { " [truncated]" } else { "" }
    );

    Response::from_parts(parts, Body::from(bytes))
}

/// Peer address of the connection, when the server recorded one.
///
/// Falls back to a `MockConnectInfo` layer when no real connection info exists.
pub async fn peer_addr<S: Send + Sync>(parts: &mut Parts, state: &S) -> Option<SocketAddr> {
    ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
        .await
        .ok()
        .map(|ConnectInfo(addr)| addr)
}

pub fn is_loopback(peer: Option<SocketAddr>) -> bool {
    peer.is_some_and(|addr| addr.ip().is_loopback())
}

/// Whether the request may skip the upstream quota.
///
/// Granted only when a bypass token is configured, the request carries it in
/// the bypass header and the connection comes from the loopback interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaBypass(pub bool);

impl FromRequestParts<AppState> for QuotaBypass {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(presented) = parts.headers.get(QUOTA_BYPASS_HEADER) else {
            return Ok(QuotaBypass(false));
        };

        let Some(expected) = state.quota_bypass_token.as_deref() else {
            warn!("Quota bypass header sent but no bypass token is configured");
            return Ok(QuotaBypass(false));
        };

        let token_matches = presented.to_str().is_ok_and(|token| token == expected);
        let peer = peer_addr(parts, state).await;
        if !token_matches {
            warn!("Quota bypass header with wrong token from {:?}", peer);
            return Ok(QuotaBypass(false));
        }
        if !is_loopback(peer) {
            warn!("Quota bypass refused for non-loopback peer {:?}", peer);
            return Ok(QuotaBypass(false));
        }

        debug!("Quota bypass granted to {:?}", peer);
        Ok(QuotaBypass(true))
    }
}

/// Peer address for handlers restricted to local callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer(pub Option<SocketAddr>);

impl Peer {
    pub fn is_loopback(&self) -> bool {
        is_loopback(self.0)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Peer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Peer(peer_addr(parts, state).await))
    }
}
