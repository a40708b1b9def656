//! Core data types shared across the ingestion and notification pipelines.

pub mod anomaly;
pub mod notification;
pub mod project;
pub mod telemetry;

pub use anomaly::{AnomalyRecord, AnomalyStatus, ProcessedAnomaly};
pub use notification::{NotificationPayload, PayloadAction, PayloadField, PayloadMetadata};
pub use project::Project;
pub use telemetry::{
    CustomEventRow, DeviceType, EventKind, IngestCommand, TelemetryEvent, WebVitalRow,
};
