//! Hooks receiving per-update failures.

use async_trait::async_trait;
use skiff_core::Params;
use tracing::warn;

use crate::bot::Bot;
use crate::error::DispatchError;

/// Receives every error that escapes an update's processing.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn report(&self, bot: &Bot, error: &DispatchError);
}

/// Sends a short report to operator chats.
#[derive(Debug, Clone)]
pub struct ChatErrorReporter {
    chat_ids: Vec<i64>,
}

impl ChatErrorReporter {
    pub fn new(chat_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            chat_ids: chat_ids.into_iter().collect(),
        }
    }

    /// The report text for `error` raised while handling `bot`'s update.
    pub fn format(bot: &Bot, error: &DispatchError) -> String {
        let context = bot.context();
        let mut text = format!("⚠️ Update {} ({}) failed", fmt_id(context.update_id()), context.kind());
        if let Some(user_id) = context.user_id() {
            text.push_str(&format!("\nuser: {user_id}"));
        }
        if let Some(chat_id) = context.chat_id() {
            text.push_str(&format!("\nchat: {chat_id}"));
        }
        text.push_str(&format!("\n\n{error}"));
        text
    }
}

fn fmt_id(id: Option<i64>) -> String {
    id.map_or_else(|| "?".to_string(), |id| id.to_string())
}

#[async_trait]
impl ErrorReporter for ChatErrorReporter {
    async fn report(&self, bot: &Bot, error: &DispatchError) {
        let text = Self::format(bot, error);
        for chat_id in &self.chat_ids {
            if let Err(e) = bot.send_message(*chat_id, text.clone(), Params::new()).await {
                warn!(chat_id, error = %e, "Failed to deliver error report");
            }
        }
    }
}
