//! Configuration schema definitions.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! usable configuration apart from the bot token.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skiff_core::ParseMode;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkiffConfig {
    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot and network
// =============================================================================

/// Identity of the bot and message defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Token issued by @BotFather (`123456:ABC-DEF...`).
    #[serde(default)]
    pub token: String,

    /// Bot API server, without a trailing slash.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Parse mode of messages that do not set one.
    #[serde(default)]
    pub parse_mode: ParseMode,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            parse_mode: ParseMode::default(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Default request timeout in seconds.
    #[serde(default = "default_network_timeout")]
    pub timeout_secs: u64,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_network_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_network_timeout(),
            connect_timeout_secs: default_network_timeout(),
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_network_timeout() -> u64 {
    10
}

// =============================================================================
// Ingestion
// =============================================================================

/// Long polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Server-side wait of one `getUpdates` call, in seconds.
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u64,

    /// Pause after a failed `getUpdates` call, in seconds.
    #[serde(default = "default_poll_backoff")]
    pub backoff_secs: u64,

    /// Skip updates queued while the bot was offline.
    #[serde(default)]
    pub drop_pending_updates: bool,

    /// Maximum number of updates per call (1-100).
    #[serde(default)]
    pub limit: Option<u32>,

    /// Update kinds to receive; empty keeps the server's choice.
    #[serde(default)]
    pub allowed_updates: Vec<String>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_poll_timeout(),
            backoff_secs: default_poll_backoff(),
            drop_pending_updates: false,
            limit: None,
            allowed_updates: Vec::new(),
        }
    }
}

impl PollingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

fn default_poll_timeout() -> u64 {
    20
}

fn default_poll_backoff() -> u64 {
    2
}

/// Webhook server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_webhook_port")]
    pub port: u16,

    /// Path Telegram posts updates to.
    #[serde(default = "default_webhook_path")]
    pub path: String,

    /// Expected `X-Telegram-Bot-Api-Secret-Token` header value.
    #[serde(default)]
    pub secret_token: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_webhook_port(),
            path: default_webhook_path(),
            secret_token: None,
        }
    }
}

impl WebhookConfig {
    /// `host:port` to bind.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_webhook_port() -> u16 {
    8443
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

// =============================================================================
// Storage and cache
// =============================================================================

/// Which state storage backend to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
    Redis,
}

/// FSM state and session storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory of the file backend.
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,

    /// Connection URL of the redis backend.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Key prefix of the redis backend.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            dir: default_storage_dir(),
            redis_url: None,
            prefix: default_redis_prefix(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(skiff_framework::storage::DEFAULT_SESSION_DIR)
}

fn default_redis_prefix() -> String {
    "skiff_fsm:".to_string()
}

/// Persistent tier of the handler metadata cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(skiff_framework::cache::DEFAULT_CACHE_DIR)
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line format of the log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `Full` otherwise.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// How often the log file is rotated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids in log lines.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line in log lines.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `skiff_transport = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SkiffConfig::default();
        assert_eq!(config.bot.api_url, "https://api.telegram.org");
        assert_eq!(config.network.timeout(), Duration::from_secs(10));
        assert_eq!(config.polling.timeout(), Duration::from_secs(20));
        assert_eq!(config.polling.backoff(), Duration::from_secs(2));
        assert_eq!(config.webhook.addr(), "0.0.0.0:8443");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.dir, PathBuf::from("storage/sessions"));
        assert!(!config.cache.enabled);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: SkiffConfig = serde_json::from_value(serde_json::json!({
            "bot": {"token": "1:abc", "parse_mode": "html"},
            "storage": {"backend": "file"},
            "logging": {"level": "debug", "filters": {"skiff_transport": "trace"}}
        }))
        .unwrap();

        assert_eq!(config.bot.token, "1:abc");
        assert_eq!(config.bot.parse_mode, ParseMode::Html);
        assert_eq!(config.bot.api_url, "https://api.telegram.org");
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.prefix, "skiff_fsm:");
        assert_eq!(config.logging.filters["skiff_transport"], LogLevel::Trace);
        assert_eq!(config.polling.timeout_secs, 20);
    }
}
