//! The axum HTTP surface: public ingest, health, and protected API routes.

mod anomalies;
mod auth;
mod error;
mod events;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::{
    config::AppConfig, ingestion::IngestionService, persistence::sqlite::SqliteStore,
    pipeline::AnomalyNotificationPipeline,
};

pub use error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The admission pipeline behind `POST /ingest/events`.
    pub ingestion: Arc<IngestionService<SqliteStore, SqliteStore>>,
    /// The notification pipeline behind the manual trigger endpoint.
    pub pipeline: Arc<AnomalyNotificationPipeline<SqliteStore, SqliteStore>>,
    /// Direct store handle for feed reads.
    pub store: Arc<SqliteStore>,
}

/// Builds the application router.
///
/// `/health` and `/ingest/events` are public; everything under `/api` sits
/// behind the bearer-token middleware.
pub fn create_router(state: ApiState) -> Router {
    let protected = Router::new()
        .route("/api/anomalies", get(anomalies::list_current))
        .route("/api/notifications/run", post(anomalies::trigger_cycle))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/ingest/events", post(events::ingest_events))
        .merge(protected)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Binds the listener and serves until the task is aborted.
pub async fn run_server(listen_address: &str, state: ApiState) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(listen_address).await?;
    tracing::info!(address = %listen_address, "HTTP server listening.");
    axum::serve(
        listener,
        create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
