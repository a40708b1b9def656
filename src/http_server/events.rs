//! The public ingest endpoint.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::{
    http_server::{error::ApiError, ApiState},
    ingestion::{device_type_from_user_agent, IngestOutcome},
    models::{DeviceType, IngestCommand, TelemetryEvent},
};

/// One telemetry event as browsers send it, before normalization.
///
/// Accepts both snake_case and the camelCase the browser SDK emits.
#[derive(Debug, Deserialize)]
pub struct RawTelemetryEvent {
    #[serde(alias = "sessionId")]
    session_id: String,
    route: Option<String>,
    path: Option<String>,
    name: String,
    value: Option<f64>,
    rating: Option<String>,
    #[serde(alias = "recordedAt", alias = "timestamp")]
    recorded_at: Option<String>,
}

/// The ingest request body.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(alias = "projectId")]
    project_id: String,
    events: Vec<RawTelemetryEvent>,
}

impl RawTelemetryEvent {
    /// Normalizes the raw event: route and path default to each other (then
    /// `/`), unparseable or missing timestamps become now.
    fn normalize(self, device_type: DeviceType, now: DateTime<Utc>) -> TelemetryEvent {
        let route = self
            .route
            .or_else(|| self.path.clone())
            .unwrap_or_else(|| "/".to_string());
        let path = self.path.unwrap_or_else(|| route.clone());
        let recorded_at = self
            .recorded_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc))
            .unwrap_or(now);

        TelemetryEvent {
            session_id: self.session_id,
            route,
            path,
            name: self.name,
            value: self.value,
            rating: self.rating,
            recorded_at,
            device_type,
        }
    }
}

/// `POST /ingest/events`: runs one batch through the admission pipeline.
pub async fn ingest_events(
    State(state): State<ApiState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let request: IngestRequest =
        serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let device_type = device_type_from_user_agent(header_str(&headers, header::USER_AGENT.as_str()));
    let now = Utc::now();
    let events = request
        .events
        .into_iter()
        .map(|event| event.normalize(device_type, now))
        .collect();
    let command = IngestCommand {
        ip: Some(client_ip(&headers, addr)),
        project_id: request.project_id,
        events,
    };

    let outcome = state
        .ingestion
        .handle(command, request_origin(&headers))
        .await
        .map_err(|e| {
            tracing::error!("Ingestion failed: {}", e);
            ApiError::InternalServerError
        })?;

    match outcome {
        IngestOutcome::Accepted {
            web_vital_count,
            custom_count,
        } => Ok(Json(json!({
            "ok": true,
            "accepted": { "web_vitals": web_vital_count, "custom_events": custom_count },
        }))),
        IngestOutcome::RateLimited(info) => Err(ApiError::RateLimited(info)),
        IngestOutcome::ProjectNotFound { project_id } => {
            Err(ApiError::NotFound(format!("unknown project: {project_id}")))
        }
        IngestOutcome::DomainMismatch {
            request_domain,
            authorized_domain,
        } => Err(ApiError::DomainMismatch {
            request_domain,
            authorized_domain,
        }),
    }
}

/// Rate-limit key: first `X-Forwarded-For` hop when present, otherwise the
/// socket peer address.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    header_str(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

/// Request origin for domain authorization: `Origin` wins over `Referer`.
fn request_origin(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, header::ORIGIN.as_str())
        .or_else(|| header_str(headers, header::REFERER.as_str()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_takes_precedence_over_socket_addr() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.9, 10.0.0.1".parse().unwrap(),
        );
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        assert_eq!(client_ip(&headers, addr), "203.0.113.9");
        assert_eq!(client_ip(&HeaderMap::new(), addr), "127.0.0.1");
    }

    #[test]
    fn origin_header_wins_over_referer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, "https://ref.example.com/p".parse().unwrap());
        assert_eq!(request_origin(&headers), Some("https://ref.example.com/p"));

        headers.insert(header::ORIGIN, "https://app.example.com".parse().unwrap());
        assert_eq!(request_origin(&headers), Some("https://app.example.com"));
    }

    #[test]
    fn normalize_defaults_route_path_and_timestamp() {
        let now = Utc::now();
        let raw: RawTelemetryEvent = serde_json::from_value(serde_json::json!({
            "sessionId": "s1",
            "name": "purchase",
            "timestamp": "not-a-date"
        }))
        .unwrap();

        let event = raw.normalize(DeviceType::Mobile, now);
        assert_eq!(event.route, "/");
        assert_eq!(event.path, "/");
        assert_eq!(event.recorded_at, now);
        assert_eq!(event.device_type, DeviceType::Mobile);
    }

    #[test]
    fn normalize_keeps_client_timestamp_and_mirrors_path() {
        let now = Utc::now();
        let raw: RawTelemetryEvent = serde_json::from_value(serde_json::json!({
            "session_id": "s1",
            "path": "/products/42",
            "name": "LCP",
            "value": 1800.0,
            "rating": "good",
            "recorded_at": "2025-06-01T12:00:00Z"
        }))
        .unwrap();

        let event = raw.normalize(DeviceType::Desktop, now);
        assert_eq!(event.route, "/products/42");
        assert_eq!(event.path, "/products/42");
        assert_eq!(
            event.recorded_at.to_rfc3339(),
            "2025-06-01T12:00:00+00:00"
        );
    }
}
