//! Checks applied to a loaded [`SkiffConfig`] before the runtime starts.

use super::error::{ConfigError, ConfigResult};
use super::schema::{
    BotConfig, LogOutput, LoggingConfig, NetworkConfig, PollingConfig, SkiffConfig,
    StorageBackend, StorageConfig, WebhookConfig,
};

/// Longest `getUpdates` wait the Bot API accepts.
const MAX_POLL_TIMEOUT_SECS: u64 = 50;

/// Validates every section, stopping at the first bad key.
pub fn validate_config(config: &SkiffConfig) -> ConfigResult<()> {
    validate_bot(&config.bot)?;
    validate_network(&config.network)?;
    validate_polling(&config.polling)?;
    validate_webhook(&config.webhook)?;
    validate_storage(&config.storage)?;
    validate_logging(&config.logging)
}

fn validate_bot(bot: &BotConfig) -> ConfigResult<()> {
    if bot.token.is_empty() {
        return Err(ConfigError::missing("bot.token"));
    }

    // `<numeric bot id>:<secret>`
    let well_formed = bot.token.split_once(':').is_some_and(|(id, secret)| {
        !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) && !secret.is_empty()
    });
    if !well_formed {
        return Err(ConfigError::invalid(
            "bot.token",
            "expected '<bot id>:<secret>'",
        ));
    }

    check_http_url("bot.api_url", &bot.api_url)
}

fn validate_network(network: &NetworkConfig) -> ConfigResult<()> {
    non_zero("network.timeout_secs", network.timeout_secs)?;
    non_zero("network.connect_timeout_secs", network.connect_timeout_secs)
}

fn validate_polling(polling: &PollingConfig) -> ConfigResult<()> {
    if polling.timeout_secs > MAX_POLL_TIMEOUT_SECS {
        return Err(ConfigError::invalid(
            "polling.timeout_secs",
            format!(
                "{} exceeds the {MAX_POLL_TIMEOUT_SECS} second maximum",
                polling.timeout_secs
            ),
        ));
    }
    non_zero("polling.backoff_secs", polling.backoff_secs)?;

    match polling.limit {
        Some(limit) if !(1..=100).contains(&limit) => Err(ConfigError::invalid(
            "polling.limit",
            format!("{limit} is outside 1..=100"),
        )),
        _ => Ok(()),
    }
}

fn validate_webhook(webhook: &WebhookConfig) -> ConfigResult<()> {
    if webhook.port == 0 {
        return Err(ConfigError::invalid("webhook.port", "port 0 cannot be bound"));
    }
    if !webhook.path.starts_with('/') {
        return Err(ConfigError::invalid(
            "webhook.path",
            format!("'{}' does not start with '/'", webhook.path),
        ));
    }

    // Telegram echoes the secret in a header, so it is limited to a header-safe alphabet.
    if let Some(secret) = &webhook.secret_token {
        let header_safe = secret
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if secret.is_empty() || secret.len() > 256 || !header_safe {
            return Err(ConfigError::invalid(
                "webhook.secret_token",
                "expected 1-256 characters of A-Z, a-z, 0-9, '_' and '-'",
            ));
        }
    }
    Ok(())
}

fn validate_storage(storage: &StorageConfig) -> ConfigResult<()> {
    match storage.backend {
        StorageBackend::Memory => Ok(()),
        StorageBackend::File if storage.dir.as_os_str().is_empty() => {
            Err(ConfigError::missing("storage.dir"))
        }
        StorageBackend::File => Ok(()),
        StorageBackend::Redis => {
            let url = storage
                .redis_url
                .as_deref()
                .ok_or(ConfigError::missing("storage.redis_url"))?;
            let scheme = url.split_once("://").map(|(scheme, _)| scheme);
            if !matches!(scheme, Some("redis" | "rediss" | "redis+unix")) {
                return Err(ConfigError::invalid(
                    "storage.redis_url",
                    format!("'{url}' is not a redis://, rediss:// or redis+unix:// URL"),
                ));
            }
            Ok(())
        }
    }
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing("logging.file_path"));
    }
    Ok(())
}

fn non_zero(key: &'static str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::invalid(key, "must be greater than 0"));
    }
    Ok(())
}

/// An absolute http(s) URL without a trailing slash, since method paths are appended to it.
fn check_http_url(key: &'static str, url: &str) -> ConfigResult<()> {
    let reason = match url.split_once("://") {
        None => "missing scheme".to_string(),
        Some((scheme, _)) if scheme != "http" && scheme != "https" => {
            format!("scheme '{scheme}' is not http or https")
        }
        Some((_, "")) => "missing host".to_string(),
        Some(_) if url.ends_with('/') => "trailing slash".to_string(),
        Some(_) => return Ok(()),
    };
    Err(ConfigError::invalid(key, format!("'{url}': {reason}")))
}
