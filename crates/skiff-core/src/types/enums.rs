//! Small closed vocabularies of the Bot API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Text formatting mode of a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseMode {
    #[serde(rename = "HTML", alias = "html")]
    Html,
    #[serde(rename = "Markdown", alias = "markdown")]
    Markdown,
    #[serde(rename = "MarkdownV2", alias = "markdownv2")]
    MarkdownV2,
    /// Plain text; no `parse_mode` is sent.
    #[default]
    #[serde(rename = "", alias = "none")]
    None,
}

impl ParseMode {
    /// The wire value, `None` for plain text.
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            Self::Html => Some("HTML"),
            Self::Markdown => Some("Markdown"),
            Self::MarkdownV2 => Some("MarkdownV2"),
            Self::None => None,
        }
    }

    /// Returns `true` for both Markdown flavours.
    pub fn is_markdown(self) -> bool {
        matches!(self, Self::Markdown | Self::MarkdownV2)
    }
}

/// Status shown in the chat header while the bot prepares a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatAction {
    Typing,
    UploadPhoto,
    UploadVideo,
    RecordVideo,
    RecordVoice,
    UploadVoice,
    UploadDocument,
    ChooseSticker,
    FindLocation,
    RecordVideoNote,
    UploadVideoNote,
}

impl ChatAction {
    /// The wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::UploadPhoto => "upload_photo",
            Self::UploadVideo => "upload_video",
            Self::RecordVideo => "record_video",
            Self::RecordVoice => "record_voice",
            Self::UploadVoice => "upload_voice",
            Self::UploadDocument => "upload_document",
            Self::ChooseSticker => "choose_sticker",
            Self::FindLocation => "find_location",
            Self::RecordVideoNote => "record_video_note",
            Self::UploadVideoNote => "upload_video_note",
        }
    }
}

impl fmt::Display for ChatAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Animated emoji accepted by `sendDice`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dice {
    #[default]
    Dice,
    Darts,
    Basketball,
    Football,
    Bowling,
    Casino,
}

impl Dice {
    /// The emoji sent to the API.
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Dice => "🎲",
            Self::Darts => "🎯",
            Self::Basketball => "🏀",
            Self::Football => "⚽",
            Self::Bowling => "🎳",
            Self::Casino => "🎰",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_deserializes_config_spellings() {
        let mode: ParseMode = serde_json::from_str("\"html\"").unwrap();
        assert_eq!(mode, ParseMode::Html);
        let mode: ParseMode = serde_json::from_str("\"MarkdownV2\"").unwrap();
        assert_eq!(mode.as_param(), Some("MarkdownV2"));
        assert_eq!(ParseMode::None.as_param(), None);
    }
}
