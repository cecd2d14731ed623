//! Typed views of the Bot API objects handlers ask for most often.
//!
//! Only the fields the framework and typical handlers use are typed; media
//! objects are kept as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A Telegram user or bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
}

impl UserDto {
    /// First and last name joined by a space.
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {last}", self.first_name),
            _ => self.first_name.clone(),
        }
    }
}

/// A private chat, group, supergroup or channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDto {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_forum: Option<bool>,
}

impl ChatDto {
    /// Returns `true` for one-to-one chats with a user.
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }
}

/// A formatting entity (`bold`, `bot_command`, `text_link`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: i64,
    pub length: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// An animated dice roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceValue {
    pub emoji: String,
    pub value: i64,
}

/// A message, including the nested message it replies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDto {
    pub message_id: i64,
    #[serde(default)]
    pub date: i64,
    pub chat: ChatDto,
    #[serde(default)]
    pub message_thread_id: Option<i64>,
    #[serde(default)]
    pub from: Option<UserDto>,
    #[serde(default)]
    pub sender_chat: Option<ChatDto>,
    #[serde(default)]
    pub reply_to_message: Option<Box<MessageDto>>,
    #[serde(default)]
    pub pinned_message: Option<Box<MessageDto>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub entities: Option<Vec<MessageEntity>>,
    #[serde(default)]
    pub caption_entities: Option<Vec<MessageEntity>>,
    #[serde(default)]
    pub dice: Option<DiceValue>,
    #[serde(default)]
    pub photo: Option<Vec<Value>>,
    #[serde(default)]
    pub sticker: Option<Value>,
    #[serde(default)]
    pub video: Option<Value>,
    #[serde(default)]
    pub audio: Option<Value>,
    #[serde(default)]
    pub voice: Option<Value>,
    #[serde(default)]
    pub document: Option<Value>,
    #[serde(default)]
    pub video_note: Option<Value>,
    #[serde(default)]
    pub is_topic_message: Option<bool>,
    #[serde(default)]
    pub new_chat_members: Option<Vec<UserDto>>,
    #[serde(default)]
    pub left_chat_member: Option<UserDto>,
}

impl MessageDto {
    /// Parses a message object.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// The text, or the caption for media messages.
    pub fn effective_text(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    /// Returns `true` if this message replies to another one.
    pub fn is_reply(&self) -> bool {
        self.reply_to_message.is_some()
    }

    /// Emoji of a dice message.
    pub fn dice_emoji(&self) -> Option<&str> {
        self.dice.as_ref().map(|d| d.emoji.as_str())
    }

    /// The highest resolution photo size (the last one Telegram sends).
    pub fn largest_photo(&self) -> Option<&Value> {
        self.photo.as_ref().and_then(|sizes| sizes.last())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_message() {
        let dto = MessageDto::from_value(&json!({
            "message_id": 123,
            "date": 1672531200,
            "chat": {"id": 999, "type": "private", "first_name": "John"}
        }))
        .unwrap();

        assert_eq!(dto.message_id, 123);
        assert_eq!(dto.chat.id, 999);
        assert!(dto.chat.is_private());
        assert!(dto.text.is_none());
        assert!(dto.from.is_none());
        assert!(!dto.is_reply());
    }

    #[test]
    fn test_reply_recursion() {
        let dto = MessageDto::from_value(&json!({
            "message_id": 200,
            "date": 0,
            "chat": {"id": 1, "type": "private"},
            "text": "This is a reply",
            "reply_to_message": {
                "message_id": 199,
                "date": 0,
                "chat": {"id": 1, "type": "private"},
                "text": "Original message",
                "from": {"id": 2, "is_bot": false, "first_name": "Bob"}
            }
        }))
        .unwrap();

        let reply = dto.reply_to_message.as_deref().unwrap();
        assert_eq!(reply.message_id, 199);
        assert_eq!(reply.from.as_ref().unwrap().id, 2);
        assert!(!reply.is_reply());
    }

    #[test]
    fn test_effective_text_and_dice() {
        let captioned = MessageDto::from_value(&json!({
            "message_id": 2, "chat": {"id": 1, "type": "a"},
            "caption": "Photo caption", "photo": []
        }))
        .unwrap();
        assert_eq!(captioned.effective_text(), Some("Photo caption"));

        let sticker = MessageDto::from_value(&json!({
            "message_id": 3, "chat": {"id": 1, "type": "a"}, "sticker": {}
        }))
        .unwrap();
        assert_eq!(sticker.effective_text(), None);

        let dice = MessageDto::from_value(&json!({
            "message_id": 4, "chat": {"id": 1, "type": "p"},
            "dice": {"emoji": "🎲", "value": 6}
        }))
        .unwrap();
        assert_eq!(dice.dice_emoji(), Some("🎲"));
        assert_eq!(dice.dice.unwrap().value, 6);
    }

    #[test]
    fn test_new_chat_members() {
        let dto = MessageDto::from_value(&json!({
            "message_id": 300,
            "chat": {"id": 500, "type": "group"},
            "new_chat_members": [
                {"id": 10, "is_bot": false, "first_name": "User1"},
                {"id": 11, "is_bot": true, "first_name": "Bot2"}
            ]
        }))
        .unwrap();

        let members = dto.new_chat_members.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].id, 10);
        assert!(members[1].is_bot);
    }
}
