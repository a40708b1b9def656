//! API error responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

use crate::rate_limiter::RateLimitInfo;

/// Errors surfaced by the API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// The request body failed to parse or validate.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The named resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request origin is not authorized for the project.
    #[error("Origin not authorized for this project")]
    DomainMismatch {
        /// Hostname the request arrived from, when derivable.
        request_domain: Option<String>,
        /// Domain pattern the project authorizes.
        authorized_domain: String,
    },

    /// The client's rate-limit budget is exhausted.
    #[error("Rate limit exceeded")]
    RateLimited(RateLimitInfo),

    /// An internal error occurred. Details stay in the logs.
    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => error_response(StatusCode::UNAUTHORIZED, json!("unauthorized")),
            ApiError::BadRequest(detail) => error_response(StatusCode::BAD_REQUEST, json!(detail)),
            ApiError::NotFound(detail) => error_response(StatusCode::NOT_FOUND, json!(detail)),
            ApiError::DomainMismatch {
                request_domain,
                authorized_domain,
            } => error_response(
                StatusCode::FORBIDDEN,
                json!({
                    "message": "origin not authorized for this project",
                    "request_domain": request_domain,
                    "authorized_domain": authorized_domain,
                }),
            ),
            ApiError::RateLimited(info) => {
                let retry_after = (info.reset_at - Utc::now()).num_seconds().max(0);
                let mut response = error_response(
                    StatusCode::TOO_MANY_REQUESTS,
                    json!({
                        "message": "rate limit exceeded",
                        "limit": info.limit,
                        "remaining": info.remaining,
                        "reset_at": info.reset_at.to_rfc3339(),
                    }),
                );
                if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            ApiError::InternalServerError => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!("internal server error"),
            ),
        }
    }
}

fn error_response(status: StatusCode, error: serde_json::Value) -> Response {
    (status, Json(json!({ "ok": false, "error": error }))).into_response()
}
