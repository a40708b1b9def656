//! The event admission pipeline: rate limiting, project resolution, origin
//! authorization and fire-and-forget persistence.

mod device;
mod origin;

use std::sync::Arc;

use chrono::Utc;

use crate::{
    models::{CustomEventRow, IngestCommand, TelemetryEvent, WebVitalRow},
    persistence::{
        error::PersistenceError,
        traits::{AnalyticsStore, ProjectRegistry},
    },
    rate_limiter::{RateLimitInfo, RateLimiter},
};

pub use device::device_type_from_user_agent;
pub use origin::{domain_matches, extract_hostname};

/// The decision the admission pipeline reached for one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// The batch passed every gate and its rows were handed to the store.
    Accepted {
        /// Web-vital rows handed to the store.
        web_vital_count: usize,
        /// Custom-event rows handed to the store.
        custom_count: usize,
    },
    /// The client's rate-limit budget is exhausted.
    RateLimited(RateLimitInfo),
    /// The batch named a project the registry does not know.
    ProjectNotFound {
        /// The unknown project id, echoed for the error response.
        project_id: String,
    },
    /// The request origin is not authorized for the project.
    DomainMismatch {
        /// Hostname the request arrived from, when one was derivable.
        request_domain: Option<String>,
        /// Domain pattern the project authorizes.
        authorized_domain: String,
    },
}

/// Admission service gating telemetry batches before they reach the store.
///
/// Gates run in a fixed short-circuit order: rate check, project resolution,
/// origin authorization, then persistence. Persistence is fire-and-forget;
/// the accepted outcome is returned before any write lands.
pub struct IngestionService<S: AnalyticsStore, P: ProjectRegistry> {
    store: Arc<S>,
    projects: Arc<P>,
    limiter: Arc<RateLimiter>,
}

impl<S: AnalyticsStore + 'static, P: ProjectRegistry> IngestionService<S, P> {
    /// Creates the service over a store, a project registry and a limiter.
    pub fn new(store: Arc<S>, projects: Arc<P>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            store,
            projects,
            limiter,
        }
    }

    /// Runs one batch through the admission gates.
    ///
    /// Only the project lookup can fail; every other gate expresses its
    /// decision as an [`IngestOutcome`]. Row writes are spawned and their
    /// failures logged, never surfaced.
    #[tracing::instrument(
        skip(self, command),
        fields(project_id = %command.project_id, events = command.events.len())
    )]
    pub async fn handle(
        &self,
        command: IngestCommand,
        request_origin: Option<&str>,
    ) -> Result<IngestOutcome, PersistenceError> {
        if let Some(key) = command.ip.as_deref() {
            let info = self.limiter.check(key);
            if !info.ok {
                return Ok(IngestOutcome::RateLimited(info));
            }
        }

        let Some(project) = self.projects.project_by_id(&command.project_id).await? else {
            tracing::warn!(project_id = %command.project_id, "batch for unknown project rejected");
            return Ok(IngestOutcome::ProjectNotFound {
                project_id: command.project_id,
            });
        };

        let request_domain = request_origin.and_then(extract_hostname);
        let authorized = match &request_domain {
            Some(hostname) => domain_matches(&project.slug, hostname),
            // Wildcard projects accept origin-less requests too.
            None => project.slug == "*",
        };
        if !authorized {
            tracing::warn!(
                project_id = %project.id,
                request_domain = ?request_domain,
                authorized_domain = %project.slug,
                "batch from unauthorized origin rejected"
            );
            return Ok(IngestOutcome::DomainMismatch {
                request_domain,
                authorized_domain: project.slug,
            });
        }

        let (web_vitals, custom_events) = build_rows(&command.project_id, command.events);
        let outcome = IngestOutcome::Accepted {
            web_vital_count: web_vitals.len(),
            custom_count: custom_events.len(),
        };

        if !web_vitals.is_empty() {
            let store = Arc::clone(&self.store);
            tokio::spawn(async move {
                if let Err(e) = store.insert_web_vitals(web_vitals).await {
                    tracing::error!("Failed to persist web vital rows: {}", e);
                }
            });
        }
        if !custom_events.is_empty() {
            let store = Arc::clone(&self.store);
            tokio::spawn(async move {
                if let Err(e) = store.insert_custom_events(custom_events).await {
                    tracing::error!("Failed to persist custom event rows: {}", e);
                }
            });
        }

        Ok(outcome)
    }
}

/// Partitions a batch into store rows, stamping every row with one shared
/// admission time.
fn build_rows(
    project_id: &str,
    events: Vec<TelemetryEvent>,
) -> (Vec<WebVitalRow>, Vec<CustomEventRow>) {
    let ingested_at = Utc::now();
    let mut web_vitals = Vec::new();
    let mut custom_events = Vec::new();

    for event in events {
        // Same split as TelemetryEvent::kind(): a value means web vital.
        match event.value {
            Some(value) => {
                web_vitals.push(WebVitalRow {
                    project_id: project_id.to_string(),
                    session_id: event.session_id,
                    route: event.route,
                    path: event.path,
                    metric_name: event.name,
                    value,
                    rating: event.rating,
                    device_type: event.device_type,
                    recorded_at: event.recorded_at,
                    ingested_at,
                });
            }
            None => custom_events.push(CustomEventRow {
                project_id: project_id.to_string(),
                session_id: event.session_id,
                route: event.route,
                path: event.path,
                event_name: event.name,
                device_type: event.device_type,
                recorded_at: event.recorded_at,
                ingested_at,
            }),
        }
    }

    (web_vitals, custom_events)
}
