//! Message construction.
//!
//! A [`MessageDraft`] holds everything that describes a message: text,
//! formatting, keyboard, media, dice or sticker. Both route [`Action`]s
//! (declarative replies) and [`Message`]s (sent from handlers) own a draft
//! and expose the same builder methods through [`MessageBuilder`].
//!
//! ```rust,ignore
//! bot.msg("Pick one")
//!     .inline_kbd(keyboard([["yes", "no"]]))
//!     .img("https://example.com/cat.png")
//!     .send()
//!     .await?;
//! ```
//!
//! [`Action`]: crate::Action

mod draft;
mod markup;

pub use draft::{
    ApiRequest, Media, MediaKind, MessageAction, MessageDraft, RenderTarget, ReplyTo,
};
pub use markup::{ButtonRegistry, Markup};

use serde_json::Value;
use skiff_core::{Dice, InputFile, Key, MessageEntity, Params, ParseMode};

use crate::bot::Bot;
use crate::error::BotResult;

/// Builder methods over a [`MessageDraft`].
pub trait MessageBuilder {
    /// The draft being built.
    fn draft_mut(&mut self) -> &mut MessageDraft;

    fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.draft_mut().text = Some(text.into());
        self
    }

    /// Merges extra request parameters.
    fn params(&mut self, params: Params) -> &mut Self {
        self.draft_mut().params.extend(params);
        self
    }

    /// Sets one extra request parameter.
    fn param(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.draft_mut().params.insert(key.into(), value.into());
        self
    }

    fn parse_mode(&mut self, mode: ParseMode) -> &mut Self {
        self.draft_mut().parse_mode = Some(mode);
        self
    }

    fn entities(&mut self, entities: Vec<MessageEntity>) -> &mut Self {
        self.draft_mut().entities = Some(entities);
        self
    }

    /// Replies to the message of the current update.
    fn reply(&mut self) -> &mut Self {
        self.draft_mut().reply_to = Some(ReplyTo::Current);
        self
    }

    /// Replies to a specific message.
    fn reply_to(&mut self, message_id: i64) -> &mut Self {
        self.draft_mut().reply_to = Some(ReplyTo::Message(message_id));
        self
    }

    /// Attaches a resizable reply keyboard.
    fn kbd(&mut self, rows: Vec<Vec<Key>>) -> &mut Self {
        self.kbd_with(rows, false, true)
    }

    /// Attaches a reply keyboard with explicit options.
    fn kbd_with(&mut self, rows: Vec<Vec<Key>>, one_time: bool, resize: bool) -> &mut Self {
        self.draft_mut().markup = Some(Markup::Reply {
            rows,
            one_time,
            resize,
        });
        self
    }

    fn inline_kbd(&mut self, rows: Vec<Vec<Key>>) -> &mut Self {
        self.draft_mut().markup = Some(Markup::Inline(rows));
        self
    }

    fn remove_kbd(&mut self) -> &mut Self {
        self.draft_mut().markup = Some(Markup::Remove);
        self
    }

    fn force_reply(&mut self, placeholder: impl Into<String>, selective: bool) -> &mut Self {
        self.draft_mut().markup = Some(Markup::ForceReply {
            placeholder: placeholder.into(),
            selective,
        });
        self
    }

    /// Attaches a media item given as URL, local path or file id.
    fn media(&mut self, kind: MediaKind, input: &str) -> &mut Self {
        self.draft_mut().media.push(Media {
            kind,
            input: InputFile::detect(input),
        });
        self
    }

    fn img(&mut self, input: &str) -> &mut Self {
        self.media(MediaKind::Photo, input)
    }

    fn gif(&mut self, input: &str) -> &mut Self {
        self.media(MediaKind::Animation, input)
    }

    fn voice(&mut self, input: &str) -> &mut Self {
        self.media(MediaKind::Voice, input)
    }

    fn audio(&mut self, input: &str) -> &mut Self {
        self.media(MediaKind::Audio, input)
    }

    fn video(&mut self, input: &str) -> &mut Self {
        self.media(MediaKind::Video, input)
    }

    fn doc(&mut self, input: &str) -> &mut Self {
        self.media(MediaKind::Document, input)
    }

    /// Sends an animated dice instead of text.
    fn dice(&mut self, dice: Dice) -> &mut Self {
        self.draft_mut().dice = Some(dice);
        self
    }

    /// Sends a sticker instead of text.
    fn sticker(&mut self, file_id: impl Into<String>) -> &mut Self {
        self.draft_mut().sticker = Some(file_id.into());
        self
    }

    /// Shows `url` as the link preview through an invisible leading link.
    fn media_preview(&mut self, url: impl Into<String>) -> &mut Self {
        self.draft_mut().preview_url = Some(url.into());
        self
    }
}

/// A message bound to the current update's facade.
#[derive(Clone)]
pub struct Message {
    bot: Bot,
    draft: MessageDraft,
    chat_id: Option<i64>,
}

impl Message {
    pub(crate) fn new(bot: Bot, text: Option<String>) -> Self {
        Self {
            bot,
            draft: MessageDraft {
                text,
                ..Default::default()
            },
            chat_id: None,
        }
    }

    /// Sends to `chat_id` instead of the current chat.
    pub fn chat(&mut self, chat_id: i64) -> &mut Self {
        self.chat_id = Some(chat_id);
        self
    }

    pub fn draft(&self) -> &MessageDraft {
        &self.draft
    }

    /// The request that performing `action` would make.
    pub fn request(&self, action: MessageAction) -> BotResult<ApiRequest> {
        self.bot.render(&self.draft, action, self.chat_id)
    }

    /// Sends the message, picking the API method from its content.
    pub async fn send(&self) -> BotResult<Value> {
        self.perform(MessageAction::Send).await
    }

    /// Replaces the text of the current update's message.
    pub async fn edit_text(&self) -> BotResult<Value> {
        self.perform(MessageAction::EditText).await
    }

    /// Replaces the caption of the current update's message.
    pub async fn edit_caption(&self) -> BotResult<Value> {
        self.perform(MessageAction::EditCaption).await
    }

    /// Replaces the media of the current update's message.
    pub async fn edit_media(&self) -> BotResult<Value> {
        self.perform(MessageAction::EditMedia).await
    }

    async fn perform(&self, action: MessageAction) -> BotResult<Value> {
        let request = self.request(action)?;
        self.bot.execute(request).await
    }
}

impl MessageBuilder for Message {
    fn draft_mut(&mut self) -> &mut MessageDraft {
        &mut self.draft
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("draft", &self.draft)
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingApi, bot_for};
    use serde_json::json;
    use skiff_core::keyboard;

    fn message_update() -> Value {
        json!({"message": {"message_id": 3, "chat": {"id": 100}, "text": "hi"}})
    }

    #[tokio::test]
    async fn test_send_text_with_keyboard() {
        let api = RecordingApi::new();
        let bot = bot_for(&api, message_update());

        bot.msg("Menu")
            .kbd(keyboard([vec![skiff_core::Button::text("Help")]]))
            .reply()
            .send()
            .await
            .unwrap();

        let (method, params) = api.last_call().unwrap();
        assert_eq!(method, "sendMessage");
        assert_eq!(params["chat_id"], 100);
        assert_eq!(params["reply_to_message_id"], 3);
        assert_eq!(params["reply_markup"]["keyboard"][0][0]["text"], "Help");
        assert_eq!(params["reply_markup"]["resize_keyboard"], true);
    }

    #[tokio::test]
    async fn test_local_file_goes_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        std::fs::write(&path, b"png").unwrap();

        let api = RecordingApi::new();
        let bot = bot_for(&api, message_update());
        bot.msg("cat")
            .img(path.to_str().unwrap())
            .chat(555)
            .send()
            .await
            .unwrap();

        let uploads = api.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "sendPhoto");
        assert_eq!(uploads[0].1["chat_id"], 555);
        assert_eq!(uploads[0].2[0].field, "photo");
    }
}
