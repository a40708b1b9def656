use std::collections::HashMap;

use serde::Deserialize;
use url::Url;

use super::HttpRetryConfig;

/// A configured outbound notification channel.
///
/// Channels are additive: adding a new kind means a new variant plus a
/// payload builder, nothing else.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelConfig {
    /// Slack incoming webhook, rendered as a block list.
    Slack(SlackChannelConfig),
    /// Microsoft Teams connector, rendered as a card with facts.
    Teams(TeamsChannelConfig),
    /// Unopinionated JSON webhook, optionally HMAC-signed.
    Webhook(WebhookChannelConfig),
}

impl ChannelConfig {
    /// Short channel kind used in log records.
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelConfig::Slack(_) => "slack",
            ChannelConfig::Teams(_) => "teams",
            ChannelConfig::Webhook(_) => "webhook",
        }
    }
}

/// Slack incoming-webhook channel settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackChannelConfig {
    /// Incoming webhook URL issued by Slack.
    pub webhook_url: Url,
    /// Delivery retry policy.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}

/// Microsoft Teams connector channel settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamsChannelConfig {
    /// Connector webhook URL issued by Teams.
    pub webhook_url: Url,
    /// Delivery retry policy.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}

/// Generic webhook channel settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChannelConfig {
    /// Destination URL.
    pub url: Url,
    /// Secret for HMAC-SHA256 payload signing; unsigned when absent.
    #[serde(default)]
    pub secret: Option<String>,
    /// Extra headers attached to every delivery.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    /// Delivery retry policy.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}
