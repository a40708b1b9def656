//! Webhook delivery with optional HMAC-SHA256 request signing.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest_middleware::ClientWithMiddleware;
use sha2::Sha256;
use url::Url;

use crate::{
    models::NotificationPayload,
    notification::{error::NotificationError, payload_builder::ChannelPayloadBuilder},
};

type HmacSha256 = Hmac<Sha256>;

const MAX_ERROR_BODY: usize = 512;

/// Delivers rendered payloads to one webhook endpoint.
///
/// When a signing secret is configured, every request carries `X-Timestamp`
/// and `X-Signature` headers; the signature is the hex HMAC-SHA256 of
/// `"{timestamp}.{body}"` under the secret.
pub struct WebhookNotifier {
    kind: &'static str,
    url: Url,
    secret: Option<String>,
    extra_headers: HashMap<String, String>,
    client: Arc<ClientWithMiddleware>,
    builder: Box<dyn ChannelPayloadBuilder>,
}

impl WebhookNotifier {
    /// Creates a notifier for one configured channel endpoint.
    pub fn new(
        kind: &'static str,
        url: Url,
        secret: Option<String>,
        extra_headers: Option<HashMap<String, String>>,
        client: Arc<ClientWithMiddleware>,
        builder: Box<dyn ChannelPayloadBuilder>,
    ) -> Self {
        Self {
            kind,
            url,
            secret,
            extra_headers: extra_headers.unwrap_or_default(),
            client,
            builder,
        }
    }

    /// Short channel kind used in log records.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Renders and delivers one notification.
    #[tracing::instrument(skip(self, payload), fields(channel = self.kind, url = %self.url))]
    pub async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotificationError> {
        let body = serde_json::to_string(&self.builder.build_payload(payload))?;

        let mut request = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "application/json");

        for (name, value) in &self.extra_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        if let Some(secret) = &self.secret {
            let timestamp = Utc::now().timestamp_millis().to_string();
            let signature = sign_payload(secret, &timestamp, &body)?;
            request = request
                .header("X-Timestamp", timestamp)
                .header("X-Signature", signature);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| NotificationError::DeliveryFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_lossy(response.text().await.unwrap_or_default());
            return Err(NotificationError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(status = status.as_u16(), "Notification delivered.");
        Ok(())
    }
}

/// Caps an error body for logging, backing off to the nearest char boundary
/// so multi-byte UTF-8 never splits.
fn truncate_lossy(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

fn sign_payload(secret: &str, timestamp: &str, body: &str) -> Result<String, NotificationError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| NotificationError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        http_client::create_retryable_http_client,
        notification::payload_builder::GenericWebhookPayloadBuilder,
        test_helpers::no_retry,
    };

    fn test_client() -> Arc<ClientWithMiddleware> {
        Arc::new(create_retryable_http_client(
            &no_retry(),
            reqwest::Client::new(),
        ))
    }

    fn notifier(url: &str, secret: Option<&str>) -> WebhookNotifier {
        WebhookNotifier::new(
            "webhook",
            Url::parse(url).unwrap(),
            secret.map(|s| s.to_string()),
            None,
            test_client(),
            Box::new(GenericWebhookPayloadBuilder),
        )
    }

    fn payload() -> NotificationPayload {
        use crate::models::PayloadMetadata;
        NotificationPayload {
            title: "Anomaly Detected: LCP on /checkout".to_string(),
            body: "LCP degraded.".to_string(),
            fields: vec![],
            actions: vec![],
            metadata: PayloadMetadata {
                anomaly_id: "a-1".to_string(),
                project_id: "p-1".to_string(),
                metric_name: "LCP".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn delivers_json_to_the_configured_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks/pulse")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"title": "Anomaly Detected: LCP on /checkout"}"#.to_string(),
            ))
            .with_status(200)
            .create_async()
            .await;

        let notifier = notifier(&format!("{}/hooks/pulse", server.url()), None);
        notifier.notify(&payload()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn signs_requests_when_a_secret_is_configured() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks/pulse")
            .match_header("x-signature", mockito::Matcher::Regex("^[0-9a-f]{64}$".to_string()))
            .match_header("x-timestamp", mockito::Matcher::Regex("^[0-9]+$".to_string()))
            .with_status(200)
            .create_async()
            .await;

        let notifier = notifier(&format!("{}/hooks/pulse", server.url()), Some("s3cret"));
        notifier.notify(&payload()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hooks/pulse")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let notifier = notifier(&format!("{}/hooks/pulse", server.url()), None);
        let err = notifier.notify(&payload()).await.unwrap_err();

        match err {
            NotificationError::UnexpectedStatus { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn multibyte_error_body_is_truncated_without_panicking() {
        // A two-byte char straddling the cap must not split mid-character.
        let long_body = format!("{}é and more", "x".repeat(MAX_ERROR_BODY - 1));
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hooks/pulse")
            .with_status(500)
            .with_body(long_body)
            .create_async()
            .await;

        let notifier = notifier(&format!("{}/hooks/pulse", server.url()), None);
        let err = notifier.notify(&payload()).await.unwrap_err();

        match err {
            NotificationError::UnexpectedStatus { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "x".repeat(MAX_ERROR_BODY - 1));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn truncate_backs_off_to_the_nearest_char_boundary() {
        let body = format!("{}日本語", "x".repeat(MAX_ERROR_BODY - 2));
        let truncated = truncate_lossy(body);

        assert!(truncated.len() <= MAX_ERROR_BODY);
        assert_eq!(truncated, "x".repeat(MAX_ERROR_BODY - 2));

        let short = truncate_lossy("fits".to_string());
        assert_eq!(short, "fits");
    }

    #[test]
    fn signature_is_deterministic_for_fixed_inputs() {
        let first = sign_payload("s3cret", "1700000000000", r#"{"a":1}"#).unwrap();
        let second = sign_payload("s3cret", "1700000000000", r#"{"a":1}"#).unwrap();
        let different = sign_payload("s3cret", "1700000000001", r#"{"a":1}"#).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 64);
    }
}
