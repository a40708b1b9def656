//! Application configuration, loaded from `app.yaml` with `PULSE__*`
//! environment overrides.

mod app_config;
mod channels;
mod http_retry;
mod rate_limit;
mod server;

pub use app_config::AppConfig;
pub use channels::{
    ChannelConfig, SlackChannelConfig, TeamsChannelConfig, WebhookChannelConfig,
};
pub use http_retry::{HttpRetryConfig, JitterSetting};
pub use rate_limit::RateLimitConfig;
pub use server::ServerConfig;

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Deserializes a `Duration` from an integral number of milliseconds.
pub(crate) fn deserialize_duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

/// Deserializes a `Duration` from an integral number of seconds.
pub(crate) fn deserialize_duration_from_seconds<'de, D>(
    deserializer: D,
) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}
