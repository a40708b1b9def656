//! Telemetry event types flowing through the admission pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Device class a telemetry event originated from, derived from the request
/// user-agent at the ingestion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Phones, tablets and other handhelds.
    Mobile,
    /// Desktops, laptops, TVs and consoles. Also the fallback when the
    /// user-agent is absent or unrecognized.
    #[default]
    Desktop,
}

impl DeviceType {
    /// Returns the canonical lowercase string stored in the analytics store.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Desktop => "desktop",
        }
    }
}

/// The kind of telemetry carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A browser performance metric (LCP, CLS, INP, ...) with a numeric value.
    WebVital,
    /// A custom business event with no numeric value.
    Custom,
}

/// A single normalized telemetry event.
///
/// Constructed once per request from the raw payload, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Client-generated session identifier.
    pub session_id: String,
    /// Route pattern the event was recorded on (e.g. `/products/[id]`).
    pub route: String,
    /// Concrete path the event was recorded on.
    pub path: String,
    /// Web-vital metric name or custom event name.
    pub name: String,
    /// Metric value; present only for web-vital events.
    pub value: Option<f64>,
    /// Vendor rating (`good` | `needs-improvement` | `poor`) for web vitals.
    pub rating: Option<String>,
    /// Client-supplied recording time, defaulted to ingestion time when the
    /// raw payload omitted it or it failed to parse.
    pub recorded_at: DateTime<Utc>,
    /// Device class derived from the request user-agent.
    pub device_type: DeviceType,
}

impl TelemetryEvent {
    /// Classifies the event: anything carrying a value is a web vital.
    pub fn kind(&self) -> EventKind {
        if self.value.is_some() {
            EventKind::WebVital
        } else {
            EventKind::Custom
        }
    }
}

/// One ingestion request: a batch of normalized events for a single project.
#[derive(Debug, Clone)]
pub struct IngestCommand {
    /// Client identifier used as the rate-limit key, when derivable.
    pub ip: Option<String>,
    /// Project the batch belongs to.
    pub project_id: String,
    /// Normalized events carried by the request.
    pub events: Vec<TelemetryEvent>,
}

/// Row shape for the web-vitals table of the analytics store.
#[derive(Debug, Clone, PartialEq)]
pub struct WebVitalRow {
    /// Owning project.
    pub project_id: String,
    /// Client session the sample belongs to.
    pub session_id: String,
    /// Route pattern.
    pub route: String,
    /// Concrete path.
    pub path: String,
    /// Metric name (LCP, CLS, ...).
    pub metric_name: String,
    /// Measured value.
    pub value: f64,
    /// Vendor rating, when the client supplied one.
    pub rating: Option<String>,
    /// Device class.
    pub device_type: DeviceType,
    /// Client-supplied recording time.
    pub recorded_at: DateTime<Utc>,
    /// Server-side admission time, shared by every row of a batch.
    pub ingested_at: DateTime<Utc>,
}

/// Row shape for the custom-events table of the analytics store.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEventRow {
    /// Owning project.
    pub project_id: String,
    /// Client session the event belongs to.
    pub session_id: String,
    /// Route pattern.
    pub route: String,
    /// Concrete path.
    pub path: String,
    /// Business event name.
    pub event_name: String,
    /// Device class.
    pub device_type: DeviceType,
    /// Client-supplied recording time.
    pub recorded_at: DateTime<Utc>,
    /// Server-side admission time, shared by every row of a batch.
    pub ingested_at: DateTime<Utc>,
}
