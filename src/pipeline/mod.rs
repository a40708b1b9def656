//! The scheduled anomaly notification pipeline.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use url::Url;

use crate::{
    models::{
        AnomalyRecord, NotificationPayload, PayloadAction, PayloadField, PayloadMetadata,
        ProcessedAnomaly, Project,
    },
    notification::ChannelDispatcher,
    persistence::{
        error::PersistenceError,
        traits::{AnalyticsStore, ProjectRegistry},
    },
};

/// Tally of one notification cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CycleSummary {
    /// Anomalies fetched from the unprocessed feed.
    pub fetched: usize,
    /// Anomalies dispatched and recorded in the dedup ledger.
    pub notified: usize,
    /// Anomalies skipped this cycle, left eligible for the next one.
    pub skipped: usize,
}

/// Reads the unprocessed anomaly feed, fans alerts out to every channel and
/// writes the dedup ledger.
///
/// The ledger entry is written once dispatch returns, regardless of how many
/// channels actually delivered. A total channel outage therefore still marks
/// anomalies notified; re-notification is an operator action on the ledger,
/// not something the pipeline retries on its own.
pub struct AnomalyNotificationPipeline<S: AnalyticsStore, P: ProjectRegistry> {
    store: Arc<S>,
    projects: Arc<P>,
    dispatcher: Arc<ChannelDispatcher>,
    dashboard_base_url: Url,
}

impl<S: AnalyticsStore, P: ProjectRegistry> AnomalyNotificationPipeline<S, P> {
    /// Creates the pipeline over a store, a registry and a dispatcher.
    pub fn new(
        store: Arc<S>,
        projects: Arc<P>,
        dispatcher: Arc<ChannelDispatcher>,
        dashboard_base_url: Url,
    ) -> Self {
        Self {
            store,
            projects,
            dispatcher,
            dashboard_base_url,
        }
    }

    /// Runs one notification cycle.
    ///
    /// With zero channels configured the cycle is a no-op before any store
    /// read. Anomalies are processed concurrently with a settle-all join so
    /// one failure never blocks siblings.
    #[tracing::instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleSummary, PersistenceError> {
        if self.dispatcher.channel_count() == 0 {
            tracing::debug!("No notification channels configured, skipping cycle.");
            return Ok(CycleSummary::default());
        }

        let anomalies = self.store.unprocessed_anomalies().await?;
        let fetched = anomalies.len();
        if fetched == 0 {
            return Ok(CycleSummary::default());
        }

        let results = join_all(
            anomalies
                .into_iter()
                .map(|anomaly| self.process_anomaly(anomaly)),
        )
        .await;

        let notified = results.iter().filter(|&&done| done).count();
        let summary = CycleSummary {
            fetched,
            notified,
            skipped: fetched - notified,
        };
        tracing::info!(
            fetched = summary.fetched,
            notified = summary.notified,
            skipped = summary.skipped,
            "Notification cycle complete."
        );
        Ok(summary)
    }

    /// Processes one anomaly; returns whether it was dispatched and ledgered.
    ///
    /// A failed or empty project lookup skips the anomaly without a ledger
    /// entry, leaving it eligible for the next cycle.
    async fn process_anomaly(&self, anomaly: AnomalyRecord) -> bool {
        let project = match self.projects.project_by_id(&anomaly.project_id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                tracing::warn!(
                    anomaly_id = %anomaly.anomaly_id,
                    project_id = %anomaly.project_id,
                    "Anomaly references an unknown project, skipping."
                );
                return false;
            }
            Err(e) => {
                tracing::error!(
                    anomaly_id = %anomaly.anomaly_id,
                    project_id = %anomaly.project_id,
                    "Project lookup failed, skipping anomaly: {}",
                    e
                );
                return false;
            }
        };

        let payload = self.build_payload(&anomaly, &project);
        let summary = self.dispatcher.dispatch_all(&payload).await;
        tracing::info!(
            anomaly_id = %anomaly.anomaly_id,
            delivered = summary.delivered,
            failed = summary.failed,
            "Anomaly dispatched."
        );

        if let Err(e) = self
            .store
            .record_processed_anomaly(ProcessedAnomaly::notified(&anomaly))
            .await
        {
            // Without a ledger entry the anomaly is re-dispatched next cycle,
            // so it must not show up in the notified tally.
            tracing::error!(
                anomaly_id = %anomaly.anomaly_id,
                "Failed to record dedup ledger entry: {}",
                e
            );
            return false;
        }
        true
    }

    fn build_payload(&self, anomaly: &AnomalyRecord, project: &Project) -> NotificationPayload {
        let title = format!(
            "Anomaly Detected: {} on {}",
            anomaly.metric_name, anomaly.route
        );
        let body = format!(
            "{} on `{}` degraded for {} traffic in {}. \
             Current average {:.2} vs baseline {:.2} ({:.2} standard deviations).",
            anomaly.metric_name,
            anomaly.route,
            anomaly.device_type,
            project.name,
            anomaly.current_avg,
            anomaly.baseline_avg,
            anomaly.z_score
        );

        let fields = vec![
            field("Route", &anomaly.route),
            field("Metric", &anomaly.metric_name),
            field("Device", &anomaly.device_type),
            field("Current Avg", &format!("{:.2}", anomaly.current_avg)),
            field("Baseline Avg", &format!("{:.2}", anomaly.baseline_avg)),
            field("Z-Score", &format!("{:.2}", anomaly.z_score)),
            field("Samples", &anomaly.sample_size.to_string()),
            field("Baseline Samples", &anomaly.baseline_n.to_string()),
        ];

        let actions = vec![
            PayloadAction {
                label: "Investigate".to_string(),
                url: self.dashboard_link(
                    &[&project.id],
                    &[("route", &anomaly.route), ("metric", &anomaly.metric_name)],
                ),
            },
            PayloadAction {
                label: "Chat with AI".to_string(),
                url: self.dashboard_link(
                    &[&project.id, "assistant"],
                    &[("anomaly", &anomaly.anomaly_id)],
                ),
            },
        ];

        NotificationPayload {
            title,
            body,
            fields,
            actions,
            metadata: PayloadMetadata {
                anomaly_id: anomaly.anomaly_id.clone(),
                project_id: anomaly.project_id.clone(),
                metric_name: anomaly.metric_name.clone(),
            },
        }
    }

    fn dashboard_link(&self, segments: &[&str], query: &[(&str, &str)]) -> String {
        let mut url = self.dashboard_base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("projects").extend(segments);
        }
        url.query_pairs_mut().extend_pairs(query);
        url.to_string()
    }

    /// Runs cycles forever on a fixed period, starting immediately.
    ///
    /// Per-cycle errors are logged and swallowed so the loop never dies.
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_cycle().await {
                tracing::error!("Notification cycle failed: {}", e);
            }
        }
    }
}

fn field(title: &str, value: &str) -> PayloadField {
    PayloadField {
        title: title.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        http_client::HttpClientPool,
        persistence::traits::{MockAnalyticsStore, MockProjectRegistry},
        test_helpers::{project, slack_channel, webhook_channel, AnomalyBuilder},
    };

    async fn dispatcher(channels: &[crate::config::ChannelConfig]) -> Arc<ChannelDispatcher> {
        Arc::new(
            ChannelDispatcher::from_channels(channels, &HttpClientPool::new())
                .await
                .unwrap(),
        )
    }

    fn pipeline(
        store: MockAnalyticsStore,
        projects: MockProjectRegistry,
        dispatcher: Arc<ChannelDispatcher>,
    ) -> AnomalyNotificationPipeline<MockAnalyticsStore, MockProjectRegistry> {
        AnomalyNotificationPipeline::new(
            Arc::new(store),
            Arc::new(projects),
            dispatcher,
            Url::parse("https://dash.example.com").unwrap(),
        )
    }

    #[tokio::test]
    async fn zero_channels_short_circuits_before_any_store_read() {
        let mut store = MockAnalyticsStore::new();
        store.expect_unprocessed_anomalies().never();
        store.expect_record_processed_anomaly().never();

        let pipeline = pipeline(store, MockProjectRegistry::new(), dispatcher(&[]).await);
        let summary = pipeline.run_cycle().await.unwrap();

        assert_eq!(summary, CycleSummary::default());
    }

    #[tokio::test]
    async fn each_anomaly_is_dispatched_once_and_ledgered() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/slack")
            .with_status(200)
            .expect(2)
            .create_async()
            .await;

        let mut store = MockAnalyticsStore::new();
        store.expect_unprocessed_anomalies().once().returning(|| {
            Ok(vec![
                AnomalyBuilder::new("a-1", "p-1").build(),
                AnomalyBuilder::new("a-2", "p-1").metric("INP").build(),
            ])
        });
        store
            .expect_record_processed_anomaly()
            .times(2)
            .returning(|_| Ok(()));

        let mut projects = MockProjectRegistry::new();
        projects
            .expect_project_by_id()
            .returning(|_| Ok(Some(project("p-1", "*.example.com"))));

        let channels = [slack_channel(&format!("{}/slack", server.url()))];
        let pipeline = pipeline(store, projects, dispatcher(&channels).await);

        let summary = pipeline.run_cycle().await.unwrap();
        assert_eq!(
            summary,
            CycleSummary {
                fetched: 2,
                notified: 2,
                skipped: 0
            }
        );
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn failing_project_lookup_skips_only_that_anomaly() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/hook")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let mut store = MockAnalyticsStore::new();
        store.expect_unprocessed_anomalies().once().returning(|| {
            Ok(vec![
                AnomalyBuilder::new("a-1", "p-broken").build(),
                AnomalyBuilder::new("a-2", "p-missing").build(),
                AnomalyBuilder::new("a-3", "p-1").build(),
            ])
        });
        store
            .expect_record_processed_anomaly()
            .withf(|entry| entry.anomaly_id == "a-3")
            .once()
            .returning(|_| Ok(()));

        let mut projects = MockProjectRegistry::new();
        projects
            .expect_project_by_id()
            .returning(|project_id| match project_id {
                "p-broken" => Err(PersistenceError::OperationFailed("db gone".to_string())),
                "p-missing" => Ok(None),
                _ => Ok(Some(project("p-1", "*"))),
            });

        let channels = [webhook_channel(&format!("{}/hook", server.url()), None)];
        let pipeline = pipeline(store, projects, dispatcher(&channels).await);

        let summary = pipeline.run_cycle().await.unwrap();
        assert_eq!(
            summary,
            CycleSummary {
                fetched: 3,
                notified: 1,
                skipped: 2
            }
        );
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn ledger_is_written_even_when_every_channel_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/down")
            .with_status(503)
            .create_async()
            .await;

        let mut store = MockAnalyticsStore::new();
        store
            .expect_unprocessed_anomalies()
            .once()
            .returning(|| Ok(vec![AnomalyBuilder::new("a-1", "p-1").build()]));
        store
            .expect_record_processed_anomaly()
            .withf(|entry| entry.anomaly_id == "a-1")
            .once()
            .returning(|_| Ok(()));

        let mut projects = MockProjectRegistry::new();
        projects
            .expect_project_by_id()
            .returning(|_| Ok(Some(project("p-1", "*"))));

        let channels = [webhook_channel(&format!("{}/down", server.url()), None)];
        let pipeline = pipeline(store, projects, dispatcher(&channels).await);

        let summary = pipeline.run_cycle().await.unwrap();
        assert_eq!(summary.notified, 1);
    }

    #[tokio::test]
    async fn failed_ledger_write_is_not_counted_as_notified() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/hook")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let mut store = MockAnalyticsStore::new();
        store
            .expect_unprocessed_anomalies()
            .once()
            .returning(|| Ok(vec![AnomalyBuilder::new("a-1", "p-1").build()]));
        store
            .expect_record_processed_anomaly()
            .once()
            .returning(|_| Err(PersistenceError::OperationFailed("db gone".to_string())));

        let mut projects = MockProjectRegistry::new();
        projects
            .expect_project_by_id()
            .returning(|_| Ok(Some(project("p-1", "*"))));

        let channels = [webhook_channel(&format!("{}/hook", server.url()), None)];
        let pipeline = pipeline(store, projects, dispatcher(&channels).await);

        // Dispatch happens, but with no ledger entry the anomaly stays
        // eligible and the summary must reflect that.
        let summary = pipeline.run_cycle().await.unwrap();
        assert_eq!(
            summary,
            CycleSummary {
                fetched: 1,
                notified: 0,
                skipped: 1
            }
        );
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn payload_carries_diagnostics_and_deep_links() {
        let store = MockAnalyticsStore::new();
        let projects = MockProjectRegistry::new();
        let pipeline = pipeline(store, projects, dispatcher(&[]).await);

        let anomaly = AnomalyBuilder::new("a-1", "p-1")
            .metric("LCP")
            .route("/checkout")
            .z_score(3.456)
            .build();
        let payload = pipeline.build_payload(&anomaly, &project("p-1", "*.example.com"));

        assert_eq!(payload.title, "Anomaly Detected: LCP on /checkout");
        assert!(payload
            .fields
            .iter()
            .any(|f| f.title == "Z-Score" && f.value == "3.46"));
        assert_eq!(payload.actions[0].label, "Investigate");
        assert!(payload.actions[0]
            .url
            .starts_with("https://dash.example.com/projects/p-1?route="));
        assert_eq!(payload.actions[1].label, "Chat with AI");
        assert!(payload.actions[1]
            .url
            .contains("/projects/p-1/assistant?anomaly=a-1"));
        assert_eq!(payload.metadata.anomaly_id, "a-1");
    }
}
