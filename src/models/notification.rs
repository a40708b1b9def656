//! Channel-agnostic notification content.

use serde::{Deserialize, Serialize};

/// A single entry in a notification's facts table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadField {
    /// Short label, e.g. `Route`.
    pub title: String,
    /// Rendered value, e.g. `/checkout`.
    pub value: String,
}

/// A deep link rendered as a button or action by the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadAction {
    /// Button label.
    pub label: String,
    /// Target URL.
    pub url: String,
}

/// Opaque routing metadata attached to every notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadMetadata {
    /// Anomaly the alert was built from.
    pub anomaly_id: String,
    /// Owning project.
    pub project_id: String,
    /// Affected metric.
    pub metric_name: String,
}

/// The channel-agnostic alert built once per anomaly.
///
/// Each channel renders its own wire shape from this via a pure, stateless
/// payload builder; the payload itself is consumed once and discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Human title, `Anomaly Detected: <metric> on <route>`.
    pub title: String,
    /// Body text summarizing project, device and a short diagnostic.
    pub body: String,
    /// Facts table rendered by channels that support one.
    pub fields: Vec<PayloadField>,
    /// Deep links ("Investigate", "Chat with AI").
    pub actions: Vec<PayloadAction>,
    /// Routing metadata carried through to generic webhook consumers.
    pub metadata: PayloadMetadata,
}
