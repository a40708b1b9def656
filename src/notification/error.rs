//! Notification delivery errors.

use thiserror::Error;

use crate::http_client::HttpClientPoolError;

/// Errors that can occur while building or delivering a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The delivery request failed at the transport layer.
    #[error("Failed to deliver notification: {0}")]
    DeliveryFailed(String),

    /// The webhook answered with a non-success status.
    #[error("Webhook returned status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code of the response.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// The payload could not be serialized for the wire.
    #[error("Failed to serialize notification payload: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The signing secret could not be used as an HMAC key.
    #[error("Invalid webhook signing secret")]
    InvalidSecret,

    /// The shared HTTP client pool failed to hand out a client.
    #[error(transparent)]
    ClientPool(#[from] HttpClientPoolError),
}
