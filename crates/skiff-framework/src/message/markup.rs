//! Reply markup and registered button lookup.

use std::collections::HashMap;

use serde_json::{Value, json};
use skiff_core::{Button, Key};

use crate::error::SetupError;

/// Labels of buttons registered with [`Router::btn`](crate::Router::btn), by id.
#[derive(Debug, Clone, Default)]
pub struct ButtonRegistry {
    labels: HashMap<String, String>,
}

impl ButtonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, label: impl Into<String>) {
        self.labels.insert(id.into(), label.into());
    }

    pub fn remove(&mut self, id: &str) -> Option<String> {
        self.labels.remove(id)
    }

    /// Label of the button `id`.
    pub fn label(&self, id: &str) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Id of the button labelled `text`.
    pub fn id_for_label(&self, text: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(_, label)| *label == text)
            .map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Keyboard attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Custom reply keyboard.
    Reply {
        rows: Vec<Vec<Key>>,
        one_time: bool,
        resize: bool,
    },
    /// Inline keyboard under the message.
    Inline(Vec<Vec<Key>>),
    /// Removes the custom keyboard.
    Remove,
    /// Forces a reply interface.
    ForceReply {
        placeholder: String,
        selective: bool,
    },
}

impl Markup {
    /// Returns `true` for inline keyboards, the only kind edits accept.
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }

    /// Renders the `reply_markup` object, resolving button ids.
    pub fn to_value(&self, buttons: &ButtonRegistry) -> Result<Value, SetupError> {
        Ok(match self {
            Self::Reply {
                rows,
                one_time,
                resize,
            } => json!({
                "keyboard": resolve_rows(rows, buttons, false)?,
                "resize_keyboard": resize,
                "one_time_keyboard": one_time,
            }),
            Self::Inline(rows) => json!({
                "inline_keyboard": resolve_rows(rows, buttons, true)?,
            }),
            Self::Remove => json!({"remove_keyboard": true}),
            Self::ForceReply {
                placeholder,
                selective,
            } => json!({
                "force_reply": true,
                "input_field_placeholder": placeholder,
                "selective": selective,
            }),
        })
    }
}

fn resolve_rows(
    rows: &[Vec<Key>],
    buttons: &ButtonRegistry,
    inline: bool,
) -> Result<Vec<Vec<Button>>, SetupError> {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|key| resolve_key(key, buttons, inline))
                .collect()
        })
        .collect()
}

fn resolve_key(key: &Key, buttons: &ButtonRegistry, inline: bool) -> Result<Button, SetupError> {
    match key {
        Key::Ref(id) => {
            let label = buttons
                .label(id)
                .ok_or_else(|| SetupError::UnknownButton(id.clone()))?;
            Ok(if inline {
                Button::cb(label, id.as_str())
            } else {
                Button::text(label)
            })
        }
        Key::Button(button) => {
            if button.text.is_empty() {
                return Err(SetupError::MalformedKeyboard(
                    "button text must not be empty".into(),
                ));
            }
            let has_action =
                button.callback_data.is_some() || button.url.is_some() || button.web_app.is_some();
            if inline && !has_action {
                return Err(SetupError::MalformedKeyboard(format!(
                    "inline button '{}' needs callback data, a URL or a web app",
                    button.text
                )));
            }
            Ok(button.clone())
        }
    }
}
