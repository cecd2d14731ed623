//! Normalized, read-only view of one inbound update.
//!
//! Telegram nests the interesting fields differently per update type (a
//! button press carries its chat inside `callback_query.message`, an inline
//! query has no chat at all). [`UpdateContext`] extracts them once, with a
//! fixed precedence, so routing never walks the raw payload again.

use std::fmt;

use serde_json::Value;

/// What kind of update arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    /// A message whose first entity is a `bot_command`.
    BotCommand,
    /// Any other new message (text, media, service message).
    Text,
    EditedMessage,
    CallbackQuery,
    InlineQuery,
    ChannelPost,
    MyChatMember,
    ChatMember,
    ChatJoinRequest,
    Unknown,
}

impl UpdateKind {
    /// Stable name used in logs and spans.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BotCommand => "bot_command",
            Self::Text => "text",
            Self::EditedMessage => "edited_message",
            Self::CallbackQuery => "callback_query",
            Self::InlineQuery => "inline_query",
            Self::ChannelPost => "channel_post",
            Self::MyChatMember => "my_chat_member",
            Self::ChatMember => "chat_member",
            Self::ChatJoinRequest => "chat_join_request",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CHAT_ID_PATHS: &[&str] = &[
    "/message/chat/id",
    "/edited_message/chat/id",
    "/callback_query/message/chat/id",
    "/channel_post/chat/id",
    "/edited_channel_post/chat/id",
    "/my_chat_member/chat/id",
    "/chat_member/chat/id",
    "/chat_join_request/chat/id",
];

const USER_ID_PATHS: &[&str] = &[
    "/message/from/id",
    "/edited_message/from/id",
    "/callback_query/from/id",
    "/inline_query/from/id",
    "/my_chat_member/from/id",
    "/chat_member/from/id",
    "/chat_join_request/from/id",
];

const MESSAGE_ID_PATHS: &[&str] = &[
    "/message/message_id",
    "/edited_message/message_id",
    "/callback_query/message/message_id",
    "/channel_post/message_id",
];

/// The per-update context.
#[derive(Debug, Clone)]
pub struct UpdateContext {
    raw: Value,
    kind: UpdateKind,
    update_id: Option<i64>,
    chat_id: Option<i64>,
    user_id: Option<i64>,
    message_id: Option<i64>,
    thread_id: Option<i64>,
    text: Option<String>,
    callback_data: Option<String>,
    query_id: Option<String>,
    reply_message_id: Option<i64>,
    reply_user_id: Option<i64>,
    reply_text: Option<String>,
}

impl UpdateContext {
    /// Extracts the canonical fields from a raw update.
    pub fn new(raw: Value) -> Self {
        let kind = detect_kind(&raw);

        let message = raw.get("message").or_else(|| raw.get("edited_message"));

        let text = match kind {
            UpdateKind::InlineQuery => str_at(&raw, "/inline_query/query"),
            UpdateKind::CallbackQuery => None,
            _ => message
                .or_else(|| raw.get("channel_post"))
                .and_then(|m| str_at(m, "/text").or_else(|| str_at(m, "/caption"))),
        };

        let query_id =
            str_at(&raw, "/callback_query/id").or_else(|| str_at(&raw, "/inline_query/id"));

        let reply = message.and_then(|m| m.get("reply_to_message"));

        Self {
            update_id: raw.get("update_id").and_then(Value::as_i64),
            chat_id: first_i64(&raw, CHAT_ID_PATHS),
            user_id: first_i64(&raw, USER_ID_PATHS),
            message_id: first_i64(&raw, MESSAGE_ID_PATHS),
            thread_id: message.and_then(|m| m.get("message_thread_id")).and_then(Value::as_i64),
            text,
            callback_data: str_at(&raw, "/callback_query/data"),
            query_id,
            reply_message_id: reply.and_then(|r| r.get("message_id")).and_then(Value::as_i64),
            reply_user_id: reply.and_then(|r| r.pointer("/from/id")).and_then(Value::as_i64),
            reply_text: reply.and_then(|r| str_at(r, "/text").or_else(|| str_at(r, "/caption"))),
            kind,
            raw,
        }
    }

    /// The untouched update payload.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn kind(&self) -> UpdateKind {
        self.kind
    }

    pub fn update_id(&self) -> Option<i64> {
        self.update_id
    }

    pub fn chat_id(&self) -> Option<i64> {
        self.chat_id
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    /// Id of the message, or of the message a pressed button is attached to.
    pub fn message_id(&self) -> Option<i64> {
        self.message_id
    }

    /// Forum topic id of the message.
    pub fn thread_id(&self) -> Option<i64> {
        self.thread_id
    }

    /// Message text (or caption), or the inline query string.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn callback_data(&self) -> Option<&str> {
        self.callback_data.as_deref()
    }

    /// Id of the callback or inline query to answer.
    pub fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref()
    }

    pub fn reply_message_id(&self) -> Option<i64> {
        self.reply_message_id
    }

    pub fn reply_user_id(&self) -> Option<i64> {
        self.reply_user_id
    }

    pub fn reply_text(&self) -> Option<&str> {
        self.reply_text.as_deref()
    }

    /// The `message` object of the update, falling back to `edited_message`.
    pub fn message(&self) -> Option<&Value> {
        self.raw
            .get("message")
            .or_else(|| self.raw.get("edited_message"))
    }

    /// Returns `true` if the update is a button press.
    pub fn is_callback(&self) -> bool {
        self.kind == UpdateKind::CallbackQuery
    }
}

fn detect_kind(raw: &Value) -> UpdateKind {
    if let Some(message) = raw.get("message") {
        let is_command = message
            .pointer("/entities/0/type")
            .and_then(Value::as_str)
            .is_some_and(|t| t == "bot_command");
        return if is_command {
            UpdateKind::BotCommand
        } else {
            UpdateKind::Text
        };
    }

    [
        ("edited_message", UpdateKind::EditedMessage),
        ("callback_query", UpdateKind::CallbackQuery),
        ("inline_query", UpdateKind::InlineQuery),
        ("channel_post", UpdateKind::ChannelPost),
        ("my_chat_member", UpdateKind::MyChatMember),
        ("chat_member", UpdateKind::ChatMember),
        ("chat_join_request", UpdateKind::ChatJoinRequest),
    ]
    .into_iter()
    .find(|(key, _)| raw.get(key).is_some())
    .map_or(UpdateKind::Unknown, |(_, kind)| kind)
}

fn first_i64(raw: &Value, paths: &[&str]) -> Option<i64> {
    paths
        .iter()
        .find_map(|path| raw.pointer(path).and_then(Value::as_i64))
}

fn str_at(value: &Value, path: &str) -> Option<String> {
    value
        .pointer(path)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_message_extraction() {
        let ctx = UpdateContext::new(json!({
            "update_id": 1001,
            "message": {
                "message_id": 55,
                "from": {"id": 123456, "is_bot": false, "first_name": "John"},
                "chat": {"id": 987654, "type": "private"},
                "date": 1600000000,
                "text": "Hello World"
            }
        }));

        assert_eq!(ctx.kind(), UpdateKind::Text);
        assert_eq!(ctx.update_id(), Some(1001));
        assert_eq!(ctx.chat_id(), Some(987654));
        assert_eq!(ctx.user_id(), Some(123456));
        assert_eq!(ctx.message_id(), Some(55));
        assert_eq!(ctx.text(), Some("Hello World"));
        assert_eq!(ctx.callback_data(), None);
    }

    #[test]
    fn test_callback_query_uses_nested_message() {
        let ctx = UpdateContext::new(json!({
            "update_id": 1002,
            "callback_query": {
                "id": "777",
                "from": {"id": 111, "first_name": "Alice"},
                "message": {
                    "message_id": 88,
                    "chat": {"id": 222, "type": "group"},
                    "text": "Menu Message"
                },
                "chat_instance": "333",
                "data": "menu_btn_click"
            }
        }));

        assert_eq!(ctx.kind(), UpdateKind::CallbackQuery);
        assert_eq!(ctx.query_id(), Some("777"));
        assert_eq!(ctx.callback_data(), Some("menu_btn_click"));
        assert_eq!(ctx.chat_id(), Some(222));
        assert_eq!(ctx.user_id(), Some(111));
        assert_eq!(ctx.message_id(), Some(88));
        assert_eq!(ctx.text(), None);
    }

    #[test]
    fn test_bot_command_detection() {
        let ctx = UpdateContext::new(json!({
            "message": {
                "message_id": 101,
                "from": {"id": 10},
                "chat": {"id": 20},
                "text": "/start",
                "entities": [{"offset": 0, "length": 6, "type": "bot_command"}]
            }
        }));

        assert_eq!(ctx.kind(), UpdateKind::BotCommand);
        assert_eq!(ctx.text(), Some("/start"));
    }

    #[test]
    fn test_edited_message_extraction() {
        let ctx = UpdateContext::new(json!({
            "edited_message": {
                "message_id": 202,
                "from": {"id": 555},
                "chat": {"id": 777},
                "text": "Edited text"
            }
        }));

        assert_eq!(ctx.kind(), UpdateKind::EditedMessage);
        assert_eq!(ctx.text(), Some("Edited text"));
        assert_eq!(ctx.chat_id(), Some(777));
        assert_eq!(ctx.user_id(), Some(555));
        assert_eq!(ctx.message_id(), Some(202));
    }

    #[test]
    fn test_inline_query_has_no_chat() {
        let ctx = UpdateContext::new(json!({
            "inline_query": {
                "id": "9999",
                "from": {"id": 444, "first_name": "Bob"},
                "query": "search query",
                "offset": ""
            }
        }));

        assert_eq!(ctx.kind(), UpdateKind::InlineQuery);
        assert_eq!(ctx.text(), Some("search query"));
        assert_eq!(ctx.query_id(), Some("9999"));
        assert_eq!(ctx.user_id(), Some(444));
        assert_eq!(ctx.chat_id(), None);
        assert_eq!(ctx.message_id(), None);
    }

    #[test]
    fn test_reply_extraction() {
        let ctx = UpdateContext::new(json!({
            "message": {
                "message_id": 500,
                "from": {"id": 100},
                "chat": {"id": 200},
                "text": "Reply msg",
                "reply_to_message": {
                    "message_id": 499,
                    "from": {"id": 101},
                    "text": "Original text"
                }
            }
        }));

        assert_eq!(ctx.reply_message_id(), Some(499));
        assert_eq!(ctx.reply_user_id(), Some(101));
        assert_eq!(ctx.reply_text(), Some("Original text"));
    }

    #[test]
    fn test_caption_counts_as_text() {
        let ctx = UpdateContext::new(json!({
            "message": {
                "message_id": 600,
                "chat": {"id": 1},
                "photo": [],
                "caption": "Photo description"
            }
        }));

        assert_eq!(ctx.text(), Some("Photo description"));
        assert_eq!(ctx.kind(), UpdateKind::Text);
    }

    #[test]
    fn test_unknown_update() {
        let ctx = UpdateContext::new(json!({"update_id": 5, "poll": {"id": "1"}}));
        assert_eq!(ctx.kind(), UpdateKind::Unknown);
        assert_eq!(ctx.user_id(), None);
    }
}
