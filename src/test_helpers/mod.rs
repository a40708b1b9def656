//! Shared fixtures and builders for unit and integration tests.

use chrono::{TimeZone, Utc};
use url::Url;

use crate::{
    config::{
        ChannelConfig, HttpRetryConfig, SlackChannelConfig, TeamsChannelConfig,
        WebhookChannelConfig,
    },
    models::{
        AnomalyRecord, CustomEventRow, DeviceType, IngestCommand, Project, TelemetryEvent,
        WebVitalRow,
    },
};

/// Builds a project whose slug doubles as the authorized origin pattern.
pub fn project(id: &str, slug: &str) -> Project {
    Project {
        id: id.to_string(),
        slug: slug.to_string(),
        name: format!("Project {id}"),
    }
}

/// Builds a web-vital telemetry event.
pub fn web_vital_event(metric: &str, value: f64) -> TelemetryEvent {
    TelemetryEvent {
        session_id: "session-1".to_string(),
        route: "/checkout".to_string(),
        path: "/checkout".to_string(),
        name: metric.to_string(),
        value: Some(value),
        rating: Some("poor".to_string()),
        recorded_at: Utc::now(),
        device_type: DeviceType::Desktop,
    }
}

/// Builds a custom business event.
pub fn custom_event(name: &str) -> TelemetryEvent {
    TelemetryEvent {
        session_id: "session-1".to_string(),
        route: "/checkout".to_string(),
        path: "/checkout".to_string(),
        name: name.to_string(),
        value: None,
        rating: None,
        recorded_at: Utc::now(),
        device_type: DeviceType::Mobile,
    }
}

/// Builds an ingest command for a batch of events.
pub fn ingest_command(project_id: &str, events: Vec<TelemetryEvent>) -> IngestCommand {
    IngestCommand {
        ip: Some("203.0.113.7".to_string()),
        project_id: project_id.to_string(),
        events,
    }
}

/// Builds a persisted web-vital row.
pub fn web_vital_row(project_id: &str) -> WebVitalRow {
    let now = Utc::now();
    WebVitalRow {
        project_id: project_id.to_string(),
        session_id: "session-1".to_string(),
        route: "/checkout".to_string(),
        path: "/checkout".to_string(),
        metric_name: "LCP".to_string(),
        value: 2400.0,
        rating: Some("needs-improvement".to_string()),
        device_type: DeviceType::Desktop,
        recorded_at: now,
        ingested_at: now,
    }
}

/// Builds a persisted custom-event row.
pub fn custom_event_row(project_id: &str) -> CustomEventRow {
    let now = Utc::now();
    CustomEventRow {
        project_id: project_id.to_string(),
        session_id: "session-1".to_string(),
        route: "/checkout".to_string(),
        path: "/checkout".to_string(),
        event_name: "purchase".to_string(),
        device_type: DeviceType::Mobile,
        recorded_at: now,
        ingested_at: now,
    }
}

/// Builder for anomaly feed records.
pub struct AnomalyBuilder {
    record: AnomalyRecord,
}

impl AnomalyBuilder {
    /// Starts a builder for the given composite key.
    pub fn new(anomaly_id: &str, project_id: &str) -> Self {
        Self {
            record: AnomalyRecord {
                anomaly_id: anomaly_id.to_string(),
                project_id: project_id.to_string(),
                route: "/checkout".to_string(),
                metric_name: "LCP".to_string(),
                device_type: "desktop".to_string(),
                detection_time: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
                current_avg: 3200.0,
                baseline_avg: 1800.0,
                z_score: 3.5,
                sample_size: 140,
                baseline_n: 2100,
            },
        }
    }

    /// Overrides the affected metric.
    pub fn metric(mut self, metric: &str) -> Self {
        self.record.metric_name = metric.to_string();
        self
    }

    /// Overrides the affected route.
    pub fn route(mut self, route: &str) -> Self {
        self.record.route = route.to_string();
        self
    }

    /// Overrides the z-score.
    pub fn z_score(mut self, z_score: f64) -> Self {
        self.record.z_score = z_score;
        self
    }

    /// Finishes the builder.
    pub fn build(self) -> AnomalyRecord {
        self.record
    }
}

/// Builds a Slack channel pointing at the given webhook URL.
pub fn slack_channel(url: &str) -> ChannelConfig {
    ChannelConfig::Slack(SlackChannelConfig {
        webhook_url: Url::parse(url).expect("test URL must parse"),
        retry_policy: no_retry(),
    })
}

/// Builds a Teams channel pointing at the given webhook URL.
pub fn teams_channel(url: &str) -> ChannelConfig {
    ChannelConfig::Teams(TeamsChannelConfig {
        webhook_url: Url::parse(url).expect("test URL must parse"),
        retry_policy: no_retry(),
    })
}

/// Builds a generic webhook channel with an optional signing secret.
pub fn webhook_channel(url: &str, secret: Option<&str>) -> ChannelConfig {
    ChannelConfig::Webhook(WebhookChannelConfig {
        url: Url::parse(url).expect("test URL must parse"),
        secret: secret.map(|s| s.to_string()),
        headers: None,
        retry_policy: no_retry(),
    })
}

/// Retry policy that never retries, keeping delivery tests deterministic.
pub fn no_retry() -> HttpRetryConfig {
    HttpRetryConfig {
        max_retries: 0,
        ..HttpRetryConfig::default()
    }
}
