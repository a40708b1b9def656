//! Storage interfaces for the admission and notification pipelines.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{
    models::{AnomalyRecord, CustomEventRow, ProcessedAnomaly, Project, WebVitalRow},
    persistence::error::PersistenceError,
};

/// The append-only analytics store: raw event sinks, the externally computed
/// anomaly view, and the dedup ledger.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Appends a batch of web-vital rows.
    async fn insert_web_vitals(&self, rows: Vec<WebVitalRow>) -> Result<(), PersistenceError>;

    /// Appends a batch of custom-event rows.
    async fn insert_custom_events(&self, rows: Vec<CustomEventRow>)
        -> Result<(), PersistenceError>;

    /// Reads every anomaly in the current detection window.
    async fn current_anomalies(&self) -> Result<Vec<AnomalyRecord>, PersistenceError>;

    /// Reads the anomalies that have no dedup ledger entry yet (anti-join on
    /// `(anomaly_id, project_id)`).
    async fn unprocessed_anomalies(&self) -> Result<Vec<AnomalyRecord>, PersistenceError>;

    /// Writes (or replaces) a dedup ledger entry. Must be idempotent on the
    /// composite key so overlapping pipeline cycles never conflict.
    async fn record_processed_anomaly(
        &self,
        entry: ProcessedAnomaly,
    ) -> Result<(), PersistenceError>;
}

/// The project registry resolving a project id to its authorized origin.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProjectRegistry: Send + Sync {
    /// Fetches a project by id; `None` when unknown.
    async fn project_by_id(&self, project_id: &str) -> Result<Option<Project>, PersistenceError>;
}
