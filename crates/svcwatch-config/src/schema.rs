//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Smallest heartbeat window that still lets the statistics strategy decide.
pub const MIN_HEARTBEAT_WINDOW: usize = 4;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub alerts: AlertsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "must be > 0"));
        }
        if self.store.timeout_ms == 0 {
            return Err(ConfigError::invalid("store.timeout_ms", "must be > 0"));
        }
        if self.monitor.interval_secs == 0 {
            return Err(ConfigError::invalid("monitor.interval_secs", "must be > 0"));
        }
        if self.monitor.heartbeat_window < MIN_HEARTBEAT_WINDOW {
            return Err(ConfigError::invalid(
                "monitor.heartbeat_window",
                format!("must be at least {}", MIN_HEARTBEAT_WINDOW),
            ));
        }
        if self.alerts.enabled && self.alerts.interval_secs == 0 {
            return Err(ConfigError::invalid("alerts.interval_secs", "must be > 0"));
        }
        if self.alerts.telegram_bot_token.is_some() != self.alerts.telegram_chat_id.is_some() {
            return Err(ConfigError::invalid(
                "alerts.telegram_chat_id",
                "telegram_bot_token and telegram_chat_id must be set together",
            ));
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL used by the CLI client commands.
    #[serde(default = "default_url")]
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            url: default_url(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8765
}

fn default_url() -> String {
    "http://localhost:8765".to_string()
}

/// Which store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite database file. `~` is expanded.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Deadline for every store call, in milliseconds.
    #[serde(default = "default_store_timeout")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
            timeout_ms: default_store_timeout(),
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("~/.svcwatch/svcwatch.db")
}

fn default_store_timeout() -> u64 {
    5000
}

/// Monitor loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between evaluation ticks.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// How many recent heartbeats the statistics strategy looks at.
    #[serde(default = "default_heartbeat_window")]
    pub heartbeat_window: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval(),
            heartbeat_window: default_heartbeat_window(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_interval() -> u64 {
    60
}

fn default_heartbeat_window() -> usize {
    100
}

fn default_true() -> bool {
    true
}

/// Alert dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Run the built-in dispatcher that consumes unalerted transitions.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Slack incoming webhook URL.
    #[serde(default)]
    pub slack_webhook: Option<String>,

    /// Telegram bot token.
    #[serde(default)]
    pub telegram_bot_token: Option<String>,

    /// Telegram chat ID.
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval(),
            slack_webhook: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
        }
    }
}

impl AlertsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for rolling log files. `None` uses `~/.svcwatch/logs`.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Whether to write log files at all.
    #[serde(default = "default_true")]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
            file: true,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
