//! Protected anomaly-feed and pipeline-trigger endpoints.

use axum::{extract::State, Json};
use serde_json::json;

use crate::{
    http_server::{error::ApiError, ApiState},
    persistence::traits::AnalyticsStore,
};

/// `GET /api/anomalies`: the current anomaly feed, newest first.
pub async fn list_current(
    State(state): State<ApiState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let anomalies = state.store.current_anomalies().await.map_err(|e| {
        tracing::error!("Failed to read anomaly feed: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(json!({
        "count": anomalies.len(),
        "anomalies": anomalies,
    })))
}

/// `POST /api/notifications/run`: triggers one notification cycle now,
/// outside the scheduler's cadence.
pub async fn trigger_cycle(
    State(state): State<ApiState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let summary = state.pipeline.run_cycle().await.map_err(|e| {
        tracing::error!("Manually triggered notification cycle failed: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(json!({ "ok": true, "summary": summary })))
}
