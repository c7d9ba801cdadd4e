//! Browser push delivery behind a small trait so the dispatcher can be tested
//! without a push service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use web_push::{
    ContentEncoding, IsahcWebPushClient, PartialVapidSignatureBuilder, SubscriptionInfo,
    URL_SAFE_NO_PAD, VapidSignatureBuilder, WebPushClient, WebPushError, WebPushMessageBuilder,
};

use crate::constants::notify::PUSH_TTL_SECONDS;
use crate::error::AppError;

/// Keys a browser hands out with its push subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A browser push subscription as produced by `PushManager.subscribe()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushData {
    pub url: String,
}

/// Notification body understood by the service worker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub data: PushData,
}

impl PushPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: PushData { url: url.into() },
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, AppError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The push service no longer knows this subscription
    #[error("subscription is gone")]
    Gone,
    #[error("delivery failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait PushService: Send + Sync {
    async fn deliver(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<(), DeliveryError>;

    /// Whether deliveries can succeed at all
    fn is_enabled(&self) -> bool {
        true
    }
}

/// VAPID-signed Web Push delivery with aes128gcm payload encryption
pub struct WebPushService {
    client: IsahcWebPushClient,
    signer: PartialVapidSignatureBuilder,
    subject: String,
}

impl WebPushService {
    /// Builds the service from the base64url VAPID private key.
    ///
    /// The key is parsed once here so a bad key fails at startup rather than
    /// on every delivery.
    pub fn new(private_key: &str, subject: &str) -> Result<Self, AppError> {
        let signer = VapidSignatureBuilder::from_base64_no_sub(private_key, URL_SAFE_NO_PAD)
            .map_err(|e| AppError::config_error(format!("Invalid VAPID private key: {e}")))?;
        let client = IsahcWebPushClient::new()
            .map_err(|e| AppError::PushDelivery(format!("Failed to create push client: {e}")))?;
        info!("Web Push delivery enabled (subject {})", subject);
        Ok(Self {
            client,
            signer,
            subject: subject.to_string(),
        })
    }
}

fn classify(error: WebPushError) -> DeliveryError {
    match error {
        WebPushError::EndpointNotValid { .. } | WebPushError::EndpointNotFound { .. } => {
            DeliveryError::Gone
        }
        other => DeliveryError::Failed(other.to_string()),
    }
}

#[async_trait]
impl PushService for WebPushService {
    async fn deliver(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<(), DeliveryError> {
        let info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut signature = self.signer.clone().add_sub_info(&info);
        signature.add_claim("sub", self.subject.as_str());
        let signature = signature.build().map_err(classify)?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        builder.set_ttl(PUSH_TTL_SECONDS);
        let message = builder.build().map_err(classify)?;

        debug!("Sending push to {}", subscription.endpoint);
        self.client.send(message).await.map_err(classify)
    }
}

/// Stand-in used when no VAPID keypair is configured
#[derive(Debug, Default)]
pub struct DisabledPushService;

#[async_trait]
impl PushService for DisabledPushService {
    async fn deliver(
        &self,
        subscription: &PushSubscription,
        _payload: &[u8],
    ) -> Result<(), DeliveryError> {
        warn!(
            "Push delivery disabled, dropping notification for {}",
            subscription.endpoint
        );
        Err(DeliveryError::Failed("push delivery disabled".to_string()))
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_shape() {
        let payload = PushPayload::new("⚽ Goal!", "Liverpool scored", "/match.html?id=1");
        let value: serde_json::Value =
            serde_json::from_slice(&payload.to_bytes().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "title": "⚽ Goal!",
                "body": "Liverpool scored",
                "data": {"url": "/match.html?id=1"}
            })
        );
    }

    #[test]
    fn test_subscription_from_browser_json() {
        let subscription: PushSubscription = serde_json::from_value(json!({
            "endpoint": "https://fcm.googleapis.com/fcm/send/abc",
            "expirationTime": null,
            "keys": {"p256dh": "BNc", "auth": "tBH"}
        }))
        .unwrap();
        assert_eq!(subscription.keys.auth, "tBH");
    }

    #[tokio::test]
    async fn test_disabled_service_fails_without_removing() {
        let service = DisabledPushService;
        let subscription = PushSubscription {
            endpoint: "https://push.example/1".to_string(),
            keys: SubscriptionKeys {
                p256dh: "p".to_string(),
                auth: "a".to_string(),
            },
        };
        let result = service.deliver(&subscription, b"{}").await;
        assert!(matches!(result, Err(DeliveryError::Failed(_))));
        assert!(!service.is_enabled());
    }

    #[test]
    fn test_invalid_vapid_key_is_a_config_error() {
        let result = WebPushService::new("not a key", "mailto:test@example.com");
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
