//! Fan-out of alerts to every configured channel.

use tracing::{error, info};

use svcwatch_config::AlertsConfig;

use crate::error::MonitorError;

use super::alert_channels::{SlackChannel, TelegramChannel};
use super::alerts::{Alert, AlertChannel, LogChannel};

/// Alert manager.
pub struct AlertManager {
    channels: Vec<Box<dyn AlertChannel>>,
}

impl AlertManager {
    /// A manager with only the log channel.
    pub fn new() -> Self {
        Self {
            channels: vec![Box::new(LogChannel)],
        }
    }

    /// A manager with exactly the given channels.
    pub fn with_channels(channels: Vec<Box<dyn AlertChannel>>) -> Self {
        Self { channels }
    }

    /// Log channel plus whatever `[alerts]` configures.
    pub fn from_config(config: &AlertsConfig) -> Self {
        let mut manager = Self::new();

        if let Some(webhook_url) = config.slack_webhook.as_deref().filter(|u| !u.is_empty()) {
            info!("Adding Slack alert channel");
            manager.add_channel(Box::new(SlackChannel::new(webhook_url)));
        }

        if let (Some(bot_token), Some(chat_id)) =
            (&config.telegram_bot_token, &config.telegram_chat_id)
        {
            if !bot_token.is_empty() && !chat_id.is_empty() {
                info!("Adding Telegram alert channel");
                manager.add_channel(Box::new(TelegramChannel::new(bot_token, chat_id)));
            }
        }

        manager
    }

    pub fn add_channel(&mut self, channel: Box<dyn AlertChannel>) {
        self.channels.push(channel);
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Send to all channels. Returns the per-channel failures.
    pub async fn send(&self, alert: &Alert) -> Vec<MonitorError> {
        let mut errors = Vec::new();

        for channel in &self.channels {
            if let Err(e) = channel.send(alert).await {
                error!(
                    service_key = %alert.service_key,
                    channel = channel.name(),
                    "Failed to send alert: {}",
                    e
                );
                errors.push(e);
            }
        }

        errors
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new()
    }
}
