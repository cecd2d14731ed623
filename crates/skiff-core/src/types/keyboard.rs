//! Keyboard buttons.
//!
//! A [`Button`] serializes to exactly the JSON object the Bot API expects, so
//! inline and reply keyboards share one type. A [`Key`] is what users put in a
//! keyboard row: either a concrete button or the id of a button registered on
//! the router, resolved when the message is sent.

use serde::{Deserialize, Serialize};

/// A Web App launched by a button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppInfo {
    pub url: String,
}

/// An inline or reply keyboard button.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_app: Option<WebAppInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_contact: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_location: Option<bool>,
}

impl Button {
    /// Inline button carrying callback data.
    pub fn cb(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            ..Default::default()
        }
    }

    /// Inline button opening a URL.
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Button launching a Web App.
    pub fn web_app(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            web_app: Some(WebAppInfo { url: url.into() }),
            ..Default::default()
        }
    }

    /// Plain reply-keyboard button.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Reply-keyboard button sharing the user's phone number.
    pub fn contact(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_contact: Some(true),
            ..Default::default()
        }
    }

    /// Reply-keyboard button sharing the user's location.
    pub fn location(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_location: Some(true),
            ..Default::default()
        }
    }
}

/// One cell of a keyboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Id of a button registered with `Router::btn`.
    Ref(String),
    /// A ready-made button.
    Button(Button),
}

impl From<&str> for Key {
    fn from(id: &str) -> Self {
        Self::Ref(id.to_string())
    }
}

impl From<String> for Key {
    fn from(id: String) -> Self {
        Self::Ref(id)
    }
}

impl From<Button> for Key {
    fn from(button: Button) -> Self {
        Self::Button(button)
    }
}

/// Builds keyboard rows from anything convertible to [`Key`].
///
/// ```rust,ignore
/// let rows = keyboard([
///     vec![Key::from("menu"), Button::url("Docs", "https://core.telegram.org").into()],
/// ]);
/// ```
pub fn keyboard<R, K>(rows: impl IntoIterator<Item = R>) -> Vec<Vec<Key>>
where
    R: IntoIterator<Item = K>,
    K: Into<Key>,
{
    rows.into_iter()
        .map(|row| row.into_iter().map(Into::into).collect())
        .collect()
}
