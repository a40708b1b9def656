use std::time::Duration;

use serde::Deserialize;

use super::deserialize_duration_from_seconds;

fn default_points() -> u32 {
    1000
}

fn default_window() -> Duration {
    Duration::from_secs(3600)
}

fn default_block_duration() -> Duration {
    Duration::ZERO
}

/// Admission-control settings for the ingest endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Point budget per key and window. Each accepted check consumes one.
    #[serde(default = "default_points")]
    pub points: u32,
    /// Window over which the budget replenishes, in seconds.
    #[serde(
        default = "default_window",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub window_secs: Duration,
    /// Extra block applied once the budget is exhausted, in seconds.
    /// Zero means no blocking beyond window expiry.
    #[serde(
        default = "default_block_duration",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub block_secs: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            points: default_points(),
            window_secs: default_window(),
            block_secs: default_block_duration(),
        }
    }
}
