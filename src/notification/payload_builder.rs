//! Channel-specific wire shapes for the channel-agnostic payload.

use serde_json::{json, Value};

use crate::models::NotificationPayload;

/// Pure, stateless transform of one notification into a channel's wire JSON.
pub trait ChannelPayloadBuilder: Send + Sync {
    /// Renders the channel-specific request body.
    fn build_payload(&self, payload: &NotificationPayload) -> Value;
}

/// Renders Slack Block Kit payloads for incoming webhooks.
pub struct SlackPayloadBuilder;

impl ChannelPayloadBuilder for SlackPayloadBuilder {
    fn build_payload(&self, payload: &NotificationPayload) -> Value {
        let mut blocks = vec![
            json!({
                "type": "header",
                "text": { "type": "plain_text", "text": payload.title, "emoji": true }
            }),
            json!({
                "type": "section",
                "text": { "type": "mrkdwn", "text": payload.body }
            }),
        ];

        if !payload.fields.is_empty() {
            // Slack caps a section at 10 fields.
            let fields: Vec<Value> = payload
                .fields
                .iter()
                .take(10)
                .map(|field| {
                    json!({
                        "type": "mrkdwn",
                        "text": format!("*{}*\n{}", field.title, field.value)
                    })
                })
                .collect();
            blocks.push(json!({ "type": "section", "fields": fields }));
        }

        if !payload.actions.is_empty() {
            let elements: Vec<Value> = payload
                .actions
                .iter()
                .map(|action| {
                    json!({
                        "type": "button",
                        "text": { "type": "plain_text", "text": action.label, "emoji": true },
                        "url": action.url
                    })
                })
                .collect();
            blocks.push(json!({ "type": "actions", "elements": elements }));
        }

        json!({ "text": payload.title, "blocks": blocks })
    }
}

/// Renders legacy `MessageCard` payloads for Teams connector webhooks.
pub struct TeamsPayloadBuilder;

impl ChannelPayloadBuilder for TeamsPayloadBuilder {
    fn build_payload(&self, payload: &NotificationPayload) -> Value {
        let facts: Vec<Value> = payload
            .fields
            .iter()
            .map(|field| json!({ "name": field.title, "value": field.value }))
            .collect();

        let actions: Vec<Value> = payload
            .actions
            .iter()
            .map(|action| {
                json!({
                    "@type": "OpenUri",
                    "name": action.label,
                    "targets": [{ "os": "default", "uri": action.url }]
                })
            })
            .collect();

        json!({
            "@type": "MessageCard",
            "@context": "http://schema.org/extensions",
            "themeColor": "D93025",
            "summary": payload.title,
            "title": payload.title,
            "text": payload.body,
            "sections": [{ "facts": facts }],
            "potentialAction": actions
        })
    }
}

/// Renders a flat JSON document for unopinionated webhook consumers.
pub struct GenericWebhookPayloadBuilder;

impl ChannelPayloadBuilder for GenericWebhookPayloadBuilder {
    fn build_payload(&self, payload: &NotificationPayload) -> Value {
        json!({
            "title": payload.title,
            "body": payload.body,
            "fields": payload.fields,
            "actions": payload.actions,
            "metadata": payload.metadata
        })
    }
}
