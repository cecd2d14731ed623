//! The message draft value object and request construction.

use serde_json::{Value, json};
use skiff_core::{Dice, InputFile, MessageEntity, Params, ParseMode, Upload};

use super::markup::{ButtonRegistry, Markup};
use crate::error::{BotError, BotResult, SetupError};

const INVISIBLE: &str = "\u{200B}";

/// What to do with a built draft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageAction {
    #[default]
    Send,
    EditText,
    EditCaption,
    EditMedia,
}

/// Kind of an attached media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Animation,
    Voice,
    Audio,
    Video,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaGroup {
    Visual,
    Audio,
    Document,
}

impl MediaKind {
    /// Parameter and `InputMedia` type name.
    pub fn field(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Animation => "animation",
            Self::Voice => "voice",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Document => "document",
        }
    }

    fn send_method(self) -> &'static str {
        match self {
            Self::Photo => "sendPhoto",
            Self::Animation => "sendAnimation",
            Self::Voice => "sendVoice",
            Self::Audio => "sendAudio",
            Self::Video => "sendVideo",
            Self::Document => "sendDocument",
        }
    }

    fn group(self) -> Option<MediaGroup> {
        match self {
            Self::Photo | Self::Animation | Self::Video => Some(MediaGroup::Visual),
            Self::Audio => Some(MediaGroup::Audio),
            Self::Document => Some(MediaGroup::Document),
            Self::Voice => None,
        }
    }
}

/// One attached media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub kind: MediaKind,
    pub input: InputFile,
}

/// Reply target of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyTo {
    /// The message of the current update.
    Current,
    Message(i64),
}

/// A Bot API request ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: &'static str,
    pub params: Params,
    /// Local files; empty unless the request must be multipart.
    pub files: Vec<Upload>,
}

/// Where and how a draft is rendered.
#[derive(Debug, Clone, Copy)]
pub struct RenderTarget<'a> {
    pub chat_id: Option<i64>,
    /// Message of the current update: reply target and edit subject.
    pub message_id: Option<i64>,
    pub buttons: &'a ButtonRegistry,
    /// Used when the draft sets no parse mode.
    pub parse_mode: ParseMode,
}

/// Declarative message data shared by actions and messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageDraft {
    pub text: Option<String>,
    pub params: Params,
    pub parse_mode: Option<ParseMode>,
    pub entities: Option<Vec<MessageEntity>>,
    pub reply_to: Option<ReplyTo>,
    pub markup: Option<Markup>,
    pub media: Vec<Media>,
    pub dice: Option<Dice>,
    pub sticker: Option<String>,
    pub preview_url: Option<String>,
}

impl MessageDraft {
    /// Returns `true` when there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().is_none_or(str::is_empty)
            && self.media.is_empty()
            && self.dice.is_none()
            && self.sticker.is_none()
            && self.preview_url.is_none()
    }

    /// Builds the API request performing `action`.
    pub fn build(&self, action: MessageAction, target: &RenderTarget<'_>) -> BotResult<ApiRequest> {
        let chat_id = target.chat_id.ok_or(BotError::Missing("chat id"))?;
        let parse_mode = self.parse_mode.unwrap_or(target.parse_mode);
        let (text, entities) = self.rendered_text(parse_mode);

        let mut params = self.params.clone();
        params.insert("chat_id".into(), json!(chat_id));
        if let Some(markup) = &self.markup {
            if action != MessageAction::Send && !markup.is_inline() {
                return Err(SetupError::MalformedKeyboard(
                    "edited messages only accept inline keyboards".into(),
                )
                .into());
            }
            params.insert("reply_markup".into(), markup.to_value(target.buttons)?);
        }
        if action == MessageAction::Send
            && let Some(reply) = self.reply_to
        {
            let id = match reply {
                ReplyTo::Message(id) => Some(id),
                ReplyTo::Current => target.message_id,
            };
            if let Some(id) = id {
                params.insert("reply_to_message_id".into(), json!(id));
            }
        }
        if action != MessageAction::Send {
            let message_id = target.message_id.ok_or(BotError::Missing("message id"))?;
            params.insert("message_id".into(), json!(message_id));
        }

        match action {
            MessageAction::Send => self.build_send(params, text, entities, parse_mode),
            MessageAction::EditText => {
                params.insert("text".into(), json!(text.unwrap_or_default()));
                insert_formatting(&mut params, parse_mode, entities, "entities");
                Ok(ApiRequest {
                    method: "editMessageText",
                    params,
                    files: Vec::new(),
                })
            }
            MessageAction::EditCaption => {
                params.insert("caption".into(), json!(text.unwrap_or_default()));
                insert_formatting(&mut params, parse_mode, entities, "caption_entities");
                Ok(ApiRequest {
                    method: "editMessageCaption",
                    params,
                    files: Vec::new(),
                })
            }
            MessageAction::EditMedia => {
                let [item] = self.media.as_slice() else {
                    return Err(SetupError::IncompatibleMedia(
                        "editing media takes exactly one item".into(),
                    )
                    .into());
                };
                let mut files = Vec::new();
                let mut media = input_media(item, item.kind.field(), 0, &mut files);
                if let Some(caption) = text {
                    media.insert("caption".into(), json!(caption));
                }
                insert_formatting(&mut media, parse_mode, entities, "caption_entities");
                params.insert("media".into(), Value::Object(media));
                Ok(ApiRequest {
                    method: "editMessageMedia",
                    params,
                    files,
                })
            }
        }
    }

    fn build_send(
        &self,
        mut params: Params,
        text: Option<String>,
        entities: Option<Vec<MessageEntity>>,
        parse_mode: ParseMode,
    ) -> BotResult<ApiRequest> {
        let request = |method, params| ApiRequest {
            method,
            params,
            files: Vec::new(),
        };

        if let Some(dice) = self.dice {
            params.insert("emoji".into(), json!(dice.emoji()));
            return Ok(request("sendDice", params));
        }

        if let Some(sticker) = &self.sticker {
            params.insert("sticker".into(), json!(sticker));
            return Ok(request("sendSticker", params));
        }

        match self.media.as_slice() {
            [] => {
                params.insert("text".into(), json!(text.unwrap_or_default()));
                insert_formatting(&mut params, parse_mode, entities, "entities");
                Ok(request("sendMessage", params))
            }
            [item] => {
                let mut files = Vec::new();
                match item.input.as_remote() {
                    Some(remote) => {
                        params.insert(item.kind.field().into(), json!(remote));
                    }
                    None => {
                        if let InputFile::Local(path) = &item.input {
                            files.push(Upload::new(item.kind.field(), path.clone()));
                        }
                    }
                }
                params.insert("caption".into(), json!(text.unwrap_or_default()));
                insert_formatting(&mut params, parse_mode, entities, "caption_entities");
                Ok(ApiRequest {
                    method: item.kind.send_method(),
                    params,
                    files,
                })
            }
            items => {
                let group = groupable(items)?;
                tracing::trace!(?group, count = items.len(), "Sending media group");

                // Media groups take no keyboard.
                params.remove("reply_markup");

                let mut files = Vec::new();
                let mut media = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let kind = match item.kind {
                        MediaKind::Animation => "video",
                        other => other.field(),
                    };
                    let mut input = input_media(item, kind, index, &mut files);
                    if index == 0 {
                        if let Some(caption) = text.as_deref().filter(|t| !t.is_empty()) {
                            input.insert("caption".into(), json!(caption));
                        }
                        insert_formatting(&mut input, parse_mode, entities.clone(), "caption_entities");
                    }
                    media.push(Value::Object(input));
                }
                params.insert("media".into(), Value::Array(media));
                Ok(ApiRequest {
                    method: "sendMediaGroup",
                    params,
                    files,
                })
            }
        }
    }

    /// Text and entities after applying the media preview link.
    fn rendered_text(&self, parse_mode: ParseMode) -> (Option<String>, Option<Vec<MessageEntity>>) {
        let text = self.text.clone();
        let entities = self.entities.clone();
        let Some(url) = &self.preview_url else {
            return (text, entities);
        };
        let body = text.unwrap_or_default();

        match parse_mode {
            ParseMode::Markdown | ParseMode::MarkdownV2 => {
                (Some(format!("[{INVISIBLE}]({url}){body}")), entities)
            }
            ParseMode::Html => (Some(format!("<a href=\"{url}\">{INVISIBLE}</a>{body}")), entities),
            ParseMode::None => {
                let link = MessageEntity {
                    kind: "text_link".into(),
                    offset: 0,
                    length: INVISIBLE.encode_utf16().count() as i64,
                    url: Some(url.clone()),
                    language: None,
                };
                let mut all = vec![link];
                all.extend(entities.unwrap_or_default().into_iter().map(|mut e| {
                    e.offset += 1;
                    e
                }));
                (Some(format!("{INVISIBLE}{body}")), Some(all))
            }
        }
    }
}

fn insert_formatting(
    params: &mut Params,
    parse_mode: ParseMode,
    entities: Option<Vec<MessageEntity>>,
    entities_field: &str,
) {
    if let Some(mode) = parse_mode.as_param() {
        params.insert("parse_mode".into(), json!(mode));
    }
    if let Some(entities) = entities.filter(|e| !e.is_empty()) {
        params.insert(entities_field.into(), json!(entities));
    }
}

fn input_media(item: &Media, kind: &str, index: usize, files: &mut Vec<Upload>) -> Params {
    let mut input = Params::new();
    input.insert("type".into(), json!(kind));
    let media = match &item.input {
        InputFile::Url(s) | InputFile::FileId(s) => s.clone(),
        InputFile::Local(path) => {
            let field = format!("media_attach_{index}");
            files.push(Upload::new(field.clone(), path.clone()));
            format!("attach://{field}")
        }
    };
    input.insert("media".into(), json!(media));
    input
}

fn groupable(items: &[Media]) -> Result<MediaGroup, SetupError> {
    let mut groups = items.iter().map(|m| m.kind.group());
    let first = groups.next().flatten();
    match first {
        Some(group) if groups.all(|g| g == Some(group)) => Ok(group),
        _ => Err(SetupError::IncompatibleMedia(
            "voice notes cannot be grouped and photo/video, audio and documents cannot be mixed"
                .into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn target(buttons: &ButtonRegistry) -> RenderTarget<'_> {
        RenderTarget {
            chat_id: Some(42),
            message_id: Some(7),
            buttons,
            parse_mode: ParseMode::None,
        }
    }

    fn media(kind: MediaKind, id: &str) -> Media {
        Media {
            kind,
            input: InputFile::FileId(id.into()),
        }
    }

    #[test]
    fn test_empty_draft() {
        assert!(MessageDraft::default().is_empty());
        let draft = MessageDraft {
            text: Some(String::new()),
            ..Default::default()
        };
        assert!(draft.is_empty());
    }

    #[test]
    fn test_plain_text_with_reply() {
        let buttons = ButtonRegistry::new();
        let draft = MessageDraft {
            text: Some("hello".into()),
            reply_to: Some(ReplyTo::Current),
            parse_mode: Some(ParseMode::Html),
            ..Default::default()
        };

        let req = draft.build(MessageAction::Send, &target(&buttons)).unwrap();
        assert_eq!(req.method, "sendMessage");
        assert_eq!(req.params["text"], "hello");
        assert_eq!(req.params["chat_id"], 42);
        assert_eq!(req.params["reply_to_message_id"], 7);
        assert_eq!(req.params["parse_mode"], "HTML");
    }

    #[test]
    fn test_single_photo_uses_caption() {
        let buttons = ButtonRegistry::new();
        let draft = MessageDraft {
            text: Some("look".into()),
            media: vec![media(MediaKind::Photo, "p1")],
            ..Default::default()
        };

        let req = draft.build(MessageAction::Send, &target(&buttons)).unwrap();
        assert_eq!(req.method, "sendPhoto");
        assert_eq!(req.params["photo"], "p1");
        assert_eq!(req.params["caption"], "look");
        assert!(req.params.get("text").is_none());
    }

    #[test]
    fn test_media_group_captions_first_item() {
        let buttons = ButtonRegistry::new();
        let draft = MessageDraft {
            text: Some("album".into()),
            media: vec![
                media(MediaKind::Photo, "p1"),
                media(MediaKind::Animation, "g1"),
                Media {
                    kind: MediaKind::Video,
                    input: InputFile::Local(PathBuf::from("/tmp/clip.mp4")),
                },
            ],
            ..Default::default()
        };

        let req = draft.build(MessageAction::Send, &target(&buttons)).unwrap();
        assert_eq!(req.method, "sendMediaGroup");
        let media = req.params["media"].as_array().unwrap();
        assert_eq!(media[0]["caption"], "album");
        assert_eq!(media[1]["type"], "video");
        assert!(media[1].get("caption").is_none());
        assert_eq!(media[2]["media"], "attach://media_attach_2");
        assert_eq!(req.files, vec![Upload::new("media_attach_2", "/tmp/clip.mp4")]);
    }

    #[test]
    fn test_incompatible_media() {
        let buttons = ButtonRegistry::new();
        for pair in [
            [MediaKind::Voice, MediaKind::Voice],
            [MediaKind::Photo, MediaKind::Audio],
        ] {
            let draft = MessageDraft {
                media: pair.iter().map(|k| media(*k, "x")).collect(),
                ..Default::default()
            };
            assert!(matches!(
                draft.build(MessageAction::Send, &target(&buttons)),
                Err(BotError::Setup(SetupError::IncompatibleMedia(_)))
            ));
        }
    }

    #[test]
    fn test_dice_and_sticker() {
        let buttons = ButtonRegistry::new();
        let dice = MessageDraft {
            dice: Some(Dice::Darts),
            ..Default::default()
        };
        let req = dice.build(MessageAction::Send, &target(&buttons)).unwrap();
        assert_eq!(req.method, "sendDice");
        assert_eq!(req.params["emoji"], "🎯");

        let sticker = MessageDraft {
            sticker: Some("CAACAg".into()),
            ..Default::default()
        };
        let req = sticker.build(MessageAction::Send, &target(&buttons)).unwrap();
        assert_eq!(req.method, "sendSticker");
    }

    #[test]
    fn test_media_preview_per_parse_mode() {
        let buttons = ButtonRegistry::new();
        let mut draft = MessageDraft {
            text: Some("caption".into()),
            preview_url: Some("https://x.io/a.png".into()),
            ..Default::default()
        };

        let req = draft.build(MessageAction::Send, &target(&buttons)).unwrap();
        assert_eq!(req.params["text"], "\u{200B}caption");
        assert_eq!(req.params["entities"][0]["type"], "text_link");
        assert_eq!(req.params["entities"][0]["length"], 1);

        draft.parse_mode = Some(ParseMode::Html);
        let req = draft.build(MessageAction::Send, &target(&buttons)).unwrap();
        assert_eq!(
            req.params["text"],
            "<a href=\"https://x.io/a.png\">\u{200B}</a>caption"
        );

        draft.parse_mode = Some(ParseMode::MarkdownV2);
        let req = draft.build(MessageAction::Send, &target(&buttons)).unwrap();
        assert_eq!(req.params["text"], "[\u{200B}](https://x.io/a.png)caption");
    }

    #[test]
    fn test_edit_variants() {
        let buttons = ButtonRegistry::new();
        let draft = MessageDraft {
            text: Some("new".into()),
            media: vec![media(MediaKind::Photo, "p2")],
            ..Default::default()
        };

        let req = draft.build(MessageAction::EditText, &target(&buttons)).unwrap();
        assert_eq!(req.method, "editMessageText");
        assert_eq!(req.params["message_id"], 7);

        let req = draft.build(MessageAction::EditCaption, &target(&buttons)).unwrap();
        assert_eq!(req.params["caption"], "new");

        let req = draft.build(MessageAction::EditMedia, &target(&buttons)).unwrap();
        assert_eq!(req.method, "editMessageMedia");
        assert_eq!(req.params["media"]["type"], "photo");
        assert_eq!(req.params["media"]["caption"], "new");
    }

    #[test]
    fn test_edit_rejects_reply_keyboard() {
        let buttons = ButtonRegistry::new();
        let draft = MessageDraft {
            text: Some("x".into()),
            markup: Some(Markup::Remove),
            ..Default::default()
        };
        assert!(draft.build(MessageAction::EditText, &target(&buttons)).is_err());
        assert!(draft.build(MessageAction::Send, &target(&buttons)).is_ok());
    }
}
