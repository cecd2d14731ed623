//! Handler return values.

use async_trait::async_trait;

use crate::bot::Bot;
use crate::error::HandlerError;
use crate::message::Message;

/// A value a handler may return.
///
/// Returning text replies in the current chat, returning a [`Message`]
/// sends it, and `Err` fails the update.
#[async_trait]
pub trait HandlerResponse: Send + 'static {
    async fn respond(self, bot: &Bot) -> Result<(), HandlerError>;
}

#[async_trait]
impl HandlerResponse for () {
    async fn respond(self, _bot: &Bot) -> Result<(), HandlerError> {
        Ok(())
    }
}

#[async_trait]
impl HandlerResponse for String {
    async fn respond(self, bot: &Bot) -> Result<(), HandlerError> {
        bot.reply(self).await?;
        Ok(())
    }
}

#[async_trait]
impl HandlerResponse for &'static str {
    async fn respond(self, bot: &Bot) -> Result<(), HandlerError> {
        bot.reply(self).await?;
        Ok(())
    }
}

#[async_trait]
impl HandlerResponse for Message {
    async fn respond(self, _bot: &Bot) -> Result<(), HandlerError> {
        self.send().await?;
        Ok(())
    }
}

#[async_trait]
impl<T: HandlerResponse> HandlerResponse for Option<T> {
    async fn respond(self, bot: &Bot) -> Result<(), HandlerError> {
        match self {
            Some(inner) => inner.respond(bot).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<T, E> HandlerResponse for Result<T, E>
where
    T: HandlerResponse,
    E: Into<HandlerError> + Send + 'static,
{
    async fn respond(self, bot: &Bot) -> Result<(), HandlerError> {
        match self {
            Ok(inner) => inner.respond(bot).await,
            Err(e) => Err(e.into()),
        }
    }
}
