//! Bearer-token authentication for the protected API endpoints.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::http_server::{error::ApiError, ApiState};

/// Rejects requests whose `Authorization: Bearer` token does not match the
/// configured API key. The comparison is constant-time. When no key is
/// configured the protected endpoints are closed entirely.
pub async fn require_bearer(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.server.api_key.as_deref() else {
        tracing::warn!("Protected endpoint hit with no API key configured.");
        return Err(ApiError::Unauthorized);
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) => {
            Ok(next.run(request).await)
        }
        _ => Err(ApiError::Unauthorized),
    }
}
