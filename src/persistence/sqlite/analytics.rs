//! `AnalyticsStore` implementation for [`SqliteStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    models::{AnomalyRecord, AnomalyStatus, CustomEventRow, ProcessedAnomaly, WebVitalRow},
    persistence::{error::PersistenceError, sqlite::SqliteStore, traits::AnalyticsStore},
};

// Helper struct for mapping ledger rows from the database.
#[derive(sqlx::FromRow)]
struct ProcessedAnomalyRow {
    anomaly_id: String,
    project_id: String,
    metric_name: String,
    route: String,
    device_type: String,
    last_z_score: f64,
    status: String,
    updated_at: DateTime<Utc>,
}

impl From<ProcessedAnomalyRow> for ProcessedAnomaly {
    fn from(row: ProcessedAnomalyRow) -> Self {
        ProcessedAnomaly {
            anomaly_id: row.anomaly_id,
            project_id: row.project_id,
            metric_name: row.metric_name,
            route: row.route,
            device_type: row.device_type,
            last_z_score: row.last_z_score,
            status: AnomalyStatus::from_str_lossy(&row.status),
            updated_at: row.updated_at,
        }
    }
}

const ANOMALY_COLUMNS: &str = "anomaly_id, project_id, route, metric_name, device_type, \
     detection_time, current_avg, baseline_avg, z_score, sample_size, baseline_n";

#[async_trait]
impl AnalyticsStore for SqliteStore {
    #[tracing::instrument(skip(self, rows), level = "debug", fields(count = rows.len()))]
    async fn insert_web_vitals(&self, rows: Vec<WebVitalRow>) -> Result<(), PersistenceError> {
        self.execute_query_with_error_handling("insert web vital rows", async {
            let mut tx = self.pool().begin().await?;
            for row in &rows {
                sqlx::query(
                    "INSERT INTO web_vitals (project_id, session_id, route, path, metric_name, \
                     value, rating, device_type, recorded_at, ingested_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&row.project_id)
                .bind(&row.session_id)
                .bind(&row.route)
                .bind(&row.path)
                .bind(&row.metric_name)
                .bind(row.value)
                .bind(&row.rating)
                .bind(row.device_type.as_str())
                .bind(row.recorded_at)
                .bind(row.ingested_at)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await
        })
        .await?;

        tracing::debug!("Web vital rows persisted.");
        Ok(())
    }

    #[tracing::instrument(skip(self, rows), level = "debug", fields(count = rows.len()))]
    async fn insert_custom_events(
        &self,
        rows: Vec<CustomEventRow>,
    ) -> Result<(), PersistenceError> {
        self.execute_query_with_error_handling("insert custom event rows", async {
            let mut tx = self.pool().begin().await?;
            for row in &rows {
                sqlx::query(
                    "INSERT INTO custom_events (project_id, session_id, route, path, event_name, \
                     device_type, recorded_at, ingested_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&row.project_id)
                .bind(&row.session_id)
                .bind(&row.route)
                .bind(&row.path)
                .bind(&row.event_name)
                .bind(row.device_type.as_str())
                .bind(row.recorded_at)
                .bind(row.ingested_at)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await
        })
        .await?;

        tracing::debug!("Custom event rows persisted.");
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn current_anomalies(&self) -> Result<Vec<AnomalyRecord>, PersistenceError> {
        self.execute_query_with_error_handling(
            "query current anomalies",
            sqlx::query_as::<_, AnomalyRecord>(&format!(
                "SELECT {ANOMALY_COLUMNS} FROM anomalies ORDER BY detection_time DESC"
            ))
            .fetch_all(self.pool()),
        )
        .await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn unprocessed_anomalies(&self) -> Result<Vec<AnomalyRecord>, PersistenceError> {
        // Anti-join: an existing ledger row for the composite key permanently
        // excludes the anomaly from notification.
        let sql = format!(
            "SELECT {} FROM anomalies a \
             LEFT JOIN processed_anomalies p \
               ON p.anomaly_id = a.anomaly_id AND p.project_id = a.project_id \
             WHERE p.anomaly_id IS NULL",
            ANOMALY_COLUMNS
                .split(", ")
                .map(|c| format!("a.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.execute_query_with_error_handling(
            "query unprocessed anomalies",
            sqlx::query_as::<_, AnomalyRecord>(&sql).fetch_all(self.pool()),
        )
        .await
    }

    #[tracing::instrument(
        skip(self, entry),
        level = "debug",
        fields(anomaly_id = %entry.anomaly_id, project_id = %entry.project_id)
    )]
    async fn record_processed_anomaly(
        &self,
        entry: ProcessedAnomaly,
    ) -> Result<(), PersistenceError> {
        self.execute_query_with_error_handling(
            "record processed anomaly",
            sqlx::query(
                "INSERT OR REPLACE INTO processed_anomalies (anomaly_id, project_id, \
                 metric_name, route, device_type, last_z_score, status, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&entry.anomaly_id)
            .bind(&entry.project_id)
            .bind(&entry.metric_name)
            .bind(&entry.route)
            .bind(&entry.device_type)
            .bind(entry.last_z_score)
            .bind(entry.status.as_str())
            .bind(entry.updated_at)
            .execute(self.pool()),
        )
        .await?;

        tracing::info!(
            anomaly_id = %entry.anomaly_id,
            project_id = %entry.project_id,
            "Dedup ledger entry recorded."
        );
        Ok(())
    }
}

impl SqliteStore {
    /// Seeds the anomaly view stand-in. The real feed is written by the
    /// analytics store's detection job, never by this subsystem.
    pub async fn insert_anomaly(&self, record: &AnomalyRecord) -> Result<(), PersistenceError> {
        self.execute_query_with_error_handling(
            "insert anomaly record",
            sqlx::query(&format!(
                "INSERT OR REPLACE INTO anomalies ({ANOMALY_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ))
            .bind(&record.anomaly_id)
            .bind(&record.project_id)
            .bind(&record.route)
            .bind(&record.metric_name)
            .bind(&record.device_type)
            .bind(record.detection_time)
            .bind(record.current_avg)
            .bind(record.baseline_avg)
            .bind(record.z_score)
            .bind(record.sample_size)
            .bind(record.baseline_n)
            .execute(self.pool()),
        )
        .await?;
        Ok(())
    }

    /// Reads one dedup ledger entry by composite key.
    pub async fn processed_anomaly(
        &self,
        anomaly_id: &str,
        project_id: &str,
    ) -> Result<Option<ProcessedAnomaly>, PersistenceError> {
        let row = self
            .execute_query_with_error_handling(
                "query processed anomaly",
                sqlx::query_as::<_, ProcessedAnomalyRow>(
                    "SELECT anomaly_id, project_id, metric_name, route, device_type, \
                     last_z_score, status, updated_at \
                     FROM processed_anomalies WHERE anomaly_id = ? AND project_id = ?",
                )
                .bind(anomaly_id)
                .bind(project_id)
                .fetch_optional(self.pool()),
            )
            .await?;
        Ok(row.map(ProcessedAnomaly::from))
    }

    /// Counts persisted web-vital rows for a project.
    pub async fn web_vital_count(&self, project_id: &str) -> Result<i64, PersistenceError> {
        self.execute_query_with_error_handling(
            "count web vital rows",
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM web_vitals WHERE project_id = ?")
                .bind(project_id)
                .fetch_one(self.pool()),
        )
        .await
    }

    /// Counts persisted custom-event rows for a project.
    pub async fn custom_event_count(&self, project_id: &str) -> Result<i64, PersistenceError> {
        self.execute_query_with_error_handling(
            "count custom event rows",
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM custom_events WHERE project_id = ?")
                .bind(project_id)
                .fetch_one(self.pool()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{custom_event_row, web_vital_row, AnomalyBuilder};

    async fn setup_store() -> SqliteStore {
        let store = SqliteStore::new("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory db");
        store.run_migrations().await.expect("Failed to run migrations");
        store
    }

    #[tokio::test]
    async fn inserts_and_counts_event_rows() {
        let store = setup_store().await;

        store
            .insert_web_vitals(vec![web_vital_row("p-1"), web_vital_row("p-1")])
            .await
            .unwrap();
        store
            .insert_custom_events(vec![custom_event_row("p-1")])
            .await
            .unwrap();

        assert_eq!(store.web_vital_count("p-1").await.unwrap(), 2);
        assert_eq!(store.custom_event_count("p-1").await.unwrap(), 1);
        assert_eq!(store.web_vital_count("p-2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn anti_join_hides_ledgered_anomalies() {
        let store = setup_store().await;
        let first = AnomalyBuilder::new("a-1", "p-1").build();
        let second = AnomalyBuilder::new("a-2", "p-1").build();
        store.insert_anomaly(&first).await.unwrap();
        store.insert_anomaly(&second).await.unwrap();

        let pending = store.unprocessed_anomalies().await.unwrap();
        assert_eq!(pending.len(), 2);

        store
            .record_processed_anomaly(ProcessedAnomaly::notified(&first))
            .await
            .unwrap();

        let pending = store.unprocessed_anomalies().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].anomaly_id, "a-2");

        // The full view still exposes both.
        assert_eq!(store.current_anomalies().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn ledger_write_is_idempotent_on_composite_key() {
        let store = setup_store().await;
        let anomaly = AnomalyBuilder::new("a-1", "p-1").z_score(3.0).build();
        store.insert_anomaly(&anomaly).await.unwrap();

        store
            .record_processed_anomaly(ProcessedAnomaly::notified(&anomaly))
            .await
            .unwrap();
        let mut replay = ProcessedAnomaly::notified(&anomaly);
        replay.last_z_score = 5.0;
        store.record_processed_anomaly(replay).await.unwrap();

        let entry = store
            .processed_anomaly("a-1", "p-1")
            .await
            .unwrap()
            .expect("ledger entry must exist");
        assert_eq!(entry.last_z_score, 5.0);
        assert_eq!(entry.status, AnomalyStatus::Notified);
        assert!(store.unprocessed_anomalies().await.unwrap().is_empty());
    }
}
