//! Multi-channel notification fan-out.

mod error;
mod payload_builder;
mod webhook;

use futures::future::join_all;

use crate::{config::ChannelConfig, http_client::HttpClientPool, models::NotificationPayload};

pub use error::NotificationError;
pub use payload_builder::{
    ChannelPayloadBuilder, GenericWebhookPayloadBuilder, SlackPayloadBuilder, TeamsPayloadBuilder,
};
pub use webhook::WebhookNotifier;

/// Per-cycle delivery tally across all channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchSummary {
    /// Channels a delivery was attempted on.
    pub attempted: usize,
    /// Deliveries acknowledged with a success status.
    pub delivered: usize,
    /// Deliveries that failed after retries.
    pub failed: usize,
}

/// Fans one notification out to every configured channel.
///
/// Channel failures are independent: each is logged and counted, none stops
/// the others or bubbles up to the caller.
pub struct ChannelDispatcher {
    notifiers: Vec<WebhookNotifier>,
}

impl ChannelDispatcher {
    /// Builds one notifier per configured channel, sharing pooled HTTP
    /// clients across channels with identical retry policies.
    pub async fn from_channels(
        channels: &[ChannelConfig],
        pool: &HttpClientPool,
    ) -> Result<Self, NotificationError> {
        let mut notifiers = Vec::with_capacity(channels.len());

        for channel in channels {
            let notifier = match channel {
                ChannelConfig::Slack(c) => WebhookNotifier::new(
                    channel.kind(),
                    c.webhook_url.clone(),
                    None,
                    None,
                    pool.get_or_create(&c.retry_policy).await?,
                    Box::new(SlackPayloadBuilder),
                ),
                ChannelConfig::Teams(c) => WebhookNotifier::new(
                    channel.kind(),
                    c.webhook_url.clone(),
                    None,
                    None,
                    pool.get_or_create(&c.retry_policy).await?,
                    Box::new(TeamsPayloadBuilder),
                ),
                ChannelConfig::Webhook(c) => WebhookNotifier::new(
                    channel.kind(),
                    c.url.clone(),
                    c.secret.clone(),
                    c.headers.clone(),
                    pool.get_or_create(&c.retry_policy).await?,
                    Box::new(GenericWebhookPayloadBuilder),
                ),
            };
            notifiers.push(notifier);
        }

        Ok(Self { notifiers })
    }

    /// Number of configured channels.
    pub fn channel_count(&self) -> usize {
        self.notifiers.len()
    }

    /// Delivers one notification to every channel in parallel.
    #[tracing::instrument(skip(self, payload), fields(channels = self.notifiers.len()))]
    pub async fn dispatch_all(&self, payload: &NotificationPayload) -> DispatchSummary {
        let deliveries = self
            .notifiers
            .iter()
            .map(|notifier| async move { (notifier.kind(), notifier.notify(payload).await) });

        let mut summary = DispatchSummary {
            attempted: self.notifiers.len(),
            ..Default::default()
        };
        for (kind, result) in join_all(deliveries).await {
            match result {
                Ok(()) => summary.delivered += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(channel = kind, "Notification delivery failed: {}", e);
                }
            }
        }
        summary
    }
}
