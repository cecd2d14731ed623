//! Inline query results.
//!
//! [`InlineResult`] builds one entry of an `answerInlineQuery` call. Media
//! results reference either a URL or a file id; [`InlineResult::file`] picks
//! the right field from the value itself.
//!
//! ```rust,ignore
//! let results = vec![
//!     bot.inline(InlineKind::Article)
//!         .id("help")
//!         .title("Help")
//!         .text("<b>Usage</b>: ...")
//!         .build(),
//!     bot.inline(InlineKind::Photo)
//!         .file("https://example.com/cat.jpg")
//!         .text("A cat")
//!         .build(),
//! ];
//! bot.answer_inline_query(results, Params::new()).await?;
//! ```

use std::fmt;

use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use skiff_core::{Button, ParseMode, Params};

/// Result type of an inline answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineKind {
    Article,
    Photo,
    Gif,
    Mpeg4Gif,
    Video,
    Audio,
    Voice,
    Document,
    Location,
    Venue,
}

impl InlineKind {
    /// The wire value of `type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Photo => "photo",
            Self::Gif => "gif",
            Self::Mpeg4Gif => "mpeg4_gif",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Voice => "voice",
            Self::Document => "document",
            Self::Location => "location",
            Self::Venue => "venue",
        }
    }

    /// Field prefix of `{prefix}_url` / `{prefix}_file_id`, `None` for
    /// results without a file.
    fn file_field(self) -> Option<&'static str> {
        match self {
            Self::Photo => Some("photo"),
            Self::Gif => Some("gif"),
            Self::Mpeg4Gif => Some("mpeg4"),
            Self::Video => Some("video"),
            Self::Audio => Some("audio"),
            Self::Voice => Some("voice"),
            Self::Document => Some("document"),
            Self::Article | Self::Location | Self::Venue => None,
        }
    }

    fn default_mime(self) -> Option<&'static str> {
        match self {
            Self::Video => Some("video/mp4"),
            Self::Document => Some("application/pdf"),
            _ => None,
        }
    }
}

impl fmt::Display for InlineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Url(String),
    FileId(String),
}

/// Builder of a single inline query result.
#[derive(Debug, Clone)]
pub struct InlineResult {
    kind: InlineKind,
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    text: Option<String>,
    parse_mode: ParseMode,
    source: Option<Source>,
    thumb: Option<String>,
    mime_type: Option<String>,
    coordinates: Option<(f64, f64)>,
    address: Option<String>,
    keyboard: Vec<Vec<Button>>,
    extra: Params,
}

impl InlineResult {
    pub fn new(kind: InlineKind) -> Self {
        Self {
            kind,
            id: None,
            title: None,
            description: None,
            text: None,
            parse_mode: ParseMode::None,
            source: None,
            thumb: None,
            mime_type: None,
            coordinates: None,
            address: None,
            keyboard: Vec::new(),
            extra: Params::new(),
        }
    }

    pub fn kind(&self) -> InlineKind {
        self.kind
    }

    /// Result id. When unset, an id is derived from the result content.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Message text for articles, caption for media.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    /// A URL when `source` starts with `http://` or `https://`, a file id
    /// otherwise.
    pub fn file(self, source: impl Into<String>) -> Self {
        let source = source.into();
        if source.starts_with("http://") || source.starts_with("https://") {
            self.file_url(source)
        } else {
            self.file_id(source)
        }
    }

    pub fn file_url(mut self, url: impl Into<String>) -> Self {
        self.source = Some(Source::Url(url.into()));
        self
    }

    pub fn file_id(mut self, file_id: impl Into<String>) -> Self {
        self.source = Some(Source::FileId(file_id.into()));
        self
    }

    /// Preview image URL.
    pub fn thumb(mut self, url: impl Into<String>) -> Self {
        self.thumb = Some(url.into());
        self
    }

    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Point of a location or venue result.
    pub fn coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some((latitude, longitude));
        self
    }

    /// Street address of a venue.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Inline keyboard attached to the result.
    pub fn kbd(mut self, rows: Vec<Vec<Button>>) -> Self {
        self.keyboard = rows;
        self
    }

    /// Extra fields. For articles they go into `input_message_content`,
    /// for everything else into the result itself.
    pub fn params(mut self, params: Params) -> Self {
        self.extra.extend(params);
        self
    }

    /// Produces the result object.
    pub fn build(self) -> Value {
        let mut result = Params::new();
        result.insert("type".into(), json!(self.kind.as_str()));
        insert_opt(&mut result, "title", self.title.as_deref());
        insert_opt(&mut result, "description", self.description.as_deref());
        insert_opt(&mut result, "thumbnail_url", self.thumb.as_deref());

        match self.kind {
            InlineKind::Article => {
                let mut content = self.message_content();
                content.extend(self.extra.clone());
                result.insert("input_message_content".into(), Value::Object(content));
            }
            InlineKind::Location | InlineKind::Venue => {
                if let Some((latitude, longitude)) = self.coordinates {
                    result.insert("latitude".into(), json!(latitude));
                    result.insert("longitude".into(), json!(longitude));
                }
                insert_opt(&mut result, "address", self.address.as_deref());
                if self.text.is_some() {
                    result.insert(
                        "input_message_content".into(),
                        Value::Object(self.message_content()),
                    );
                }
                result.extend(self.extra.clone());
            }
            _ => {
                self.media_fields(&mut result);
                result.extend(self.extra.clone());
            }
        }

        if !self.keyboard.is_empty() {
            result.insert(
                "reply_markup".into(),
                json!({ "inline_keyboard": self.keyboard }),
            );
        }

        let id = self.id.unwrap_or_else(|| content_id(&result));
        result.insert("id".into(), json!(id));
        Value::Object(result)
    }

    fn message_content(&self) -> Params {
        let mut content = Params::new();
        content.insert(
            "message_text".into(),
            json!(self.text.as_deref().unwrap_or_default()),
        );
        if let Some(mode) = self.parse_mode.as_param() {
            content.insert("parse_mode".into(), json!(mode));
        }
        content
    }

    fn media_fields(&self, result: &mut Params) {
        let Some(field) = self.kind.file_field() else {
            return;
        };
        match &self.source {
            Some(Source::Url(url)) => {
                result.insert(format!("{field}_url"), json!(url));
                // Photos and GIFs sent by URL need a preview; the file itself works.
                if matches!(self.kind, InlineKind::Photo | InlineKind::Gif | InlineKind::Mpeg4Gif)
                    && !result.contains_key("thumbnail_url")
                {
                    result.insert("thumbnail_url".into(), json!(url));
                }
            }
            Some(Source::FileId(file_id)) => {
                result.insert(format!("{field}_file_id"), json!(file_id));
            }
            None => {}
        }

        if let Some(mime) = self.mime_type.as_deref().or(self.kind.default_mime()) {
            result.insert("mime_type".into(), json!(mime));
        }
        if let Some(caption) = &self.text {
            result.insert("caption".into(), json!(caption));
            if let Some(mode) = self.parse_mode.as_param() {
                result.insert("parse_mode".into(), json!(mode));
            }
        }
    }
}

fn insert_opt(map: &mut Params, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        map.insert(key.into(), json!(value));
    }
}

/// First 32 hex chars of the SHA-256 of the serialized result.
fn content_id(result: &Params) -> String {
    let digest = Sha256::digest(Value::Object(result.clone()).to_string().as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(32);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article() {
        let result = InlineResult::new(InlineKind::Article)
            .id("101")
            .title("Test Title")
            .description("Test Description")
            .text("<b>Hello</b>")
            .parse_mode(ParseMode::Html)
            .build();

        assert_eq!(result["type"], "article");
        assert_eq!(result["id"], "101");
        assert_eq!(result["title"], "Test Title");
        assert_eq!(result["description"], "Test Description");
        assert_eq!(result["input_message_content"]["message_text"], "<b>Hello</b>");
        assert_eq!(result["input_message_content"]["parse_mode"], "HTML");
    }

    #[test]
    fn test_photo_by_url() {
        let result = InlineResult::new(InlineKind::Photo)
            .id("photo_1")
            .file_url("https://example.com/image.jpg")
            .thumb("https://example.com/thumb.jpg")
            .text("Caption text")
            .build();

        assert_eq!(result["type"], "photo");
        assert_eq!(result["photo_url"], "https://example.com/image.jpg");
        assert_eq!(result["thumbnail_url"], "https://example.com/thumb.jpg");
        assert_eq!(result["caption"], "Caption text");
        assert!(result.get("photo_file_id").is_none());
    }

    #[test]
    fn test_photo_by_file_id() {
        let result = InlineResult::new(InlineKind::Photo)
            .id("photo_2")
            .file_id("AgACAgIA...")
            .build();

        assert_eq!(result["photo_file_id"], "AgACAgIA...");
        assert!(result.get("photo_url").is_none());
        assert!(result.get("thumbnail_url").is_none());
    }

    #[test]
    fn test_file_detects_source() {
        let by_url = InlineResult::new(InlineKind::Mpeg4Gif)
            .file("http://url.com/a.mp4")
            .build();
        assert_eq!(by_url["type"], "mpeg4_gif");
        assert_eq!(by_url["mpeg4_url"], "http://url.com/a.mp4");

        let by_id = InlineResult::new(InlineKind::Gif).file("123").build();
        assert_eq!(by_id["gif_file_id"], "123");

        for (kind, field) in [
            (InlineKind::Audio, "audio_file_id"),
            (InlineKind::Voice, "voice_file_id"),
        ] {
            let result = InlineResult::new(kind).id("x").file("123").build();
            assert_eq!(result["type"], kind.as_str());
            assert_eq!(result[field], "123");
        }
    }

    #[test]
    fn test_mime_types() {
        let video = InlineResult::new(InlineKind::Video)
            .id("vid_1")
            .file_url("https://example.com/video.mp4")
            .title("Video Title")
            .build();
        assert_eq!(video["mime_type"], "video/mp4");

        let document = InlineResult::new(InlineKind::Document)
            .file_id("123")
            .mime_type("application/zip")
            .build();
        assert_eq!(document["document_file_id"], "123");
        assert_eq!(document["mime_type"], "application/zip");
    }

    #[test]
    fn test_keyboard() {
        let result = InlineResult::new(InlineKind::Article)
            .text("Menu")
            .kbd(vec![vec![Button::cb("btn1", "1")]])
            .build();

        assert_eq!(
            result["reply_markup"],
            json!({"inline_keyboard": [[{"text": "btn1", "callback_data": "1"}]]})
        );
    }

    #[test]
    fn test_extra_params_placement() {
        let mut extra = Params::new();
        extra.insert("custom_field".into(), json!(123));
        extra.insert("reply_width".into(), json!(50));

        let article = InlineResult::new(InlineKind::Article)
            .text("Text")
            .params(extra.clone())
            .build();
        assert_eq!(article["input_message_content"]["custom_field"], 123);
        assert_eq!(article["input_message_content"]["reply_width"], 50);

        let photo = InlineResult::new(InlineKind::Photo)
            .file_id("abc")
            .params(extra)
            .build();
        assert_eq!(photo["custom_field"], 123);
    }

    #[test]
    fn test_location_and_venue() {
        let location = InlineResult::new(InlineKind::Location)
            .coordinates(55.75, 37.61)
            .title("Moscow")
            .build();
        assert_eq!(location["type"], "location");
        assert_eq!(location["latitude"], 55.75);
        assert_eq!(location["longitude"], 37.61);

        let venue = InlineResult::new(InlineKind::Venue)
            .coordinates(50.0, 50.0)
            .title("Home")
            .address("Baker St")
            .build();
        assert_eq!(venue["type"], "venue");
        assert_eq!(venue["title"], "Home");
        assert_eq!(venue["address"], "Baker St");
    }

    #[test]
    fn test_generated_id_is_stable() {
        let make = || InlineResult::new(InlineKind::Article).title("A").text("a").build();
        let id = make()["id"].as_str().unwrap().to_string();
        assert_eq!(id.len(), 32);
        assert_eq!(make()["id"], id.as_str());

        let other = InlineResult::new(InlineKind::Article).title("B").build();
        assert_ne!(other["id"], id.as_str());
    }
}
