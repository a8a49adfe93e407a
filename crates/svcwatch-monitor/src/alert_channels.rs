//! Alert channel implementations (Slack, Telegram).

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::MonitorError;

use super::alerts::{Alert, AlertChannel};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// POST `payload` and turn a non-2xx reply into an alert error.
async fn post_json(
    client: &reqwest::Client,
    channel: &str,
    url: &str,
    payload: &Value,
) -> Result<(), MonitorError> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|e| MonitorError::Alert(format!("{} request failed: {}", channel, e)))?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(MonitorError::Alert(format!(
        "{} returned {}: {}",
        channel, status, body
    )))
}

/// Block Kit message: headline, then one field per side of the change.
pub(crate) fn slack_payload(alert: &Alert) -> Value {
    let headline = format!("{} {}", alert.severity.emoji(), alert.message);

    let mut fields = vec![json!({
        "type": "mrkdwn",
        "text": format!("*Service*\n`{}`", alert.service_key),
    })];
    if let (Some(from), Some(to)) = (alert.from_state, alert.to_state) {
        fields.push(json!({ "type": "mrkdwn", "text": format!("*From*\n{}", from.as_str()) }));
        fields.push(json!({ "type": "mrkdwn", "text": format!("*To*\n{}", to.as_str()) }));
    }
    fields.push(json!({
        "type": "mrkdwn",
        "text": format!("*Severity*\n{}", alert.severity),
    }));

    json!({
        "text": headline,
        "blocks": [
            { "type": "section", "text": { "type": "mrkdwn", "text": headline } },
            { "type": "section", "fields": fields },
            {
                "type": "context",
                "elements": [{
                    "type": "mrkdwn",
                    "text": format!("svcwatch at {}", alert.timestamp.to_rfc3339()),
                }],
            },
        ],
    })
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// HTML body for the Bot API; keys with underscores survive unlike Markdown.
pub(crate) fn telegram_text(alert: &Alert) -> String {
    let mut text = format!(
        "{} <b>{}</b>",
        alert.severity.emoji(),
        escape_html(&alert.service_key)
    );
    if let Some(change) = alert.change() {
        text.push_str(&format!(" <code>{}</code>", change));
    }
    text.push_str(&format!(
        "\n{}\n<i>{}</i>",
        escape_html(&alert.message),
        alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    text
}

/// Slack incoming-webhook channel.
pub struct SlackChannel {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackChannel {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AlertChannel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, alert: &Alert) -> Result<(), MonitorError> {
        post_json(&self.client, "Slack", &self.webhook_url, &slack_payload(alert)).await?;
        debug!(service_key = %alert.service_key, "Slack alert sent");
        Ok(())
    }
}

/// Telegram bot channel.
pub struct TelegramChannel {
    api_base: String,
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            api_base: TELEGRAM_API.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the channel at a different Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}

#[async_trait]
impl AlertChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, alert: &Alert) -> Result<(), MonitorError> {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": telegram_text(alert),
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        post_json(&self.client, "Telegram", &self.send_message_url(), &payload).await?;
        debug!(service_key = %alert.service_key, "Telegram alert sent");
        Ok(())
    }
}
