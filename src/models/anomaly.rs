//! Anomaly feed and dedup ledger types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One detected anomaly as exposed by the analytics store's anomaly view.
///
/// Produced externally by comparing a recent window to a historical baseline;
/// this subsystem only reads it and never re-derives its semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnomalyRecord {
    /// Feed-assigned identifier, stable across cycles for the same condition.
    pub anomaly_id: String,
    /// Project the anomaly was detected for.
    pub project_id: String,
    /// Route the regression was observed on.
    pub route: String,
    /// Affected web-vital metric.
    pub metric_name: String,
    /// Device segment the regression was observed in.
    pub device_type: String,
    /// When the anomaly view computed this record.
    pub detection_time: DateTime<Utc>,
    /// Raw average over the recent window.
    pub current_avg: f64,
    /// Raw average over the historical baseline.
    pub baseline_avg: f64,
    /// Deviation of the current window from the baseline.
    pub z_score: f64,
    /// Sample count in the current window.
    pub sample_size: i64,
    /// Sample count in the baseline.
    pub baseline_n: i64,
}

/// Lifecycle status of a processed anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyStatus {
    /// Recorded but not yet notified.
    New,
    /// A notification attempt was made.
    Notified,
    /// An operator acknowledged the alert.
    Acknowledged,
    /// The underlying condition cleared.
    Resolved,
}

impl AnomalyStatus {
    /// Canonical lowercase form stored in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyStatus::New => "new",
            AnomalyStatus::Notified => "notified",
            AnomalyStatus::Acknowledged => "acknowledged",
            AnomalyStatus::Resolved => "resolved",
        }
    }

    /// Parses the stored form back; unknown values map to `New`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "notified" => AnomalyStatus::Notified,
            "acknowledged" => AnomalyStatus::Acknowledged,
            "resolved" => AnomalyStatus::Resolved,
            _ => AnomalyStatus::New,
        }
    }
}

/// Dedup ledger entry keyed by `(anomaly_id, project_id)`.
///
/// Its mere existence excludes the anomaly from every future notification
/// cycle, regardless of whether any channel actually delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedAnomaly {
    /// Feed-assigned anomaly identifier.
    pub anomaly_id: String,
    /// Project the anomaly belongs to.
    pub project_id: String,
    /// Affected metric, denormalized for ledger queries.
    pub metric_name: String,
    /// Affected route, denormalized for ledger queries.
    pub route: String,
    /// Device segment, denormalized for ledger queries.
    pub device_type: String,
    /// Z-score observed when the entry was written.
    pub last_z_score: f64,
    /// Lifecycle status; the pipeline only ever writes `Notified`.
    pub status: AnomalyStatus,
    /// Last time the entry was written or replaced.
    pub updated_at: DateTime<Utc>,
}

impl ProcessedAnomaly {
    /// Builds the `notified` ledger entry for an anomaly, stamped now.
    pub fn notified(record: &AnomalyRecord) -> Self {
        Self {
            anomaly_id: record.anomaly_id.clone(),
            project_id: record.project_id.clone(),
            metric_name: record.metric_name.clone(),
            route: record.route.clone(),
            device_type: record.device_type.clone(),
            last_z_score: record.z_score,
            status: AnomalyStatus::Notified,
            updated_at: Utc::now(),
        }
    }
}
