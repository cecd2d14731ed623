//! Polls and quizzes.

use serde_json::{Value, json};
use skiff_core::{ParseMode, Params};

use crate::bot::Bot;
use crate::error::{BotError, BotResult};

const MIN_OPEN_PERIOD: u32 = 5;
const MAX_OPEN_PERIOD: u32 = 600;

/// Poll type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PollKind {
    #[default]
    Regular,
    /// One correct option, optionally explained after answering.
    Quiz,
}

impl PollKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Quiz => "quiz",
        }
    }
}

/// A poll bound to the current update's facade.
///
/// Only the settings that were set are sent. Correct option and
/// explanation are dropped for regular polls.
#[derive(Clone)]
pub struct Poll {
    bot: Bot,
    kind: PollKind,
    question: String,
    options: Vec<String>,
    anonymous: Option<bool>,
    multiple_answers: Option<bool>,
    correct_option: Option<usize>,
    explanation: Option<String>,
    explanation_parse_mode: ParseMode,
    open_period: Option<u32>,
    closed: Option<bool>,
    chat_id: Option<i64>,
}

impl Poll {
    pub(crate) fn new(bot: Bot, kind: PollKind) -> Self {
        Self {
            bot,
            kind,
            question: String::new(),
            options: Vec::new(),
            anonymous: None,
            multiple_answers: None,
            correct_option: None,
            explanation: None,
            explanation_parse_mode: ParseMode::None,
            open_period: None,
            closed: None,
            chat_id: None,
        }
    }

    pub fn question(&mut self, question: impl Into<String>) -> &mut Self {
        self.question = question.into();
        self
    }

    /// Appends answer options.
    pub fn answers<I, S>(&mut self, options: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    pub fn anonymous(&mut self, anonymous: bool) -> &mut Self {
        self.anonymous = Some(anonymous);
        self
    }

    pub fn multiple_answers(&mut self, allowed: bool) -> &mut Self {
        self.multiple_answers = Some(allowed);
        self
    }

    /// Zero-based index of the right option of a quiz.
    pub fn correct_answer(&mut self, index: usize) -> &mut Self {
        self.correct_option = Some(index);
        self
    }

    /// Text shown after a wrong quiz answer.
    pub fn explanation(&mut self, text: impl Into<String>) -> &mut Self {
        self.explanation = Some(text.into());
        self
    }

    pub fn explanation_parse_mode(&mut self, mode: ParseMode) -> &mut Self {
        self.explanation_parse_mode = mode;
        self
    }

    /// Seconds the poll stays open. Values outside 5..=600 become 600.
    pub fn open_period(&mut self, seconds: u32) -> &mut Self {
        self.open_period = Some(if (MIN_OPEN_PERIOD..=MAX_OPEN_PERIOD).contains(&seconds) {
            seconds
        } else {
            MAX_OPEN_PERIOD
        });
        self
    }

    /// Sends the poll already closed.
    pub fn close(&mut self, closed: bool) -> &mut Self {
        self.closed = Some(closed);
        self
    }

    /// Sends to `chat_id` instead of the current chat.
    pub fn chat(&mut self, chat_id: i64) -> &mut Self {
        self.chat_id = Some(chat_id);
        self
    }

    /// `sendPoll` parameters.
    pub fn params(&self) -> BotResult<Params> {
        let chat_id = self
            .chat_id
            .or(self.bot.chat_id())
            .ok_or(BotError::Missing("chat"))?;

        let mut params = Params::new();
        params.insert("chat_id".into(), json!(chat_id));
        params.insert("question".into(), json!(self.question));
        params.insert(
            "options".into(),
            self.options.iter().map(|text| json!({ "text": text })).collect(),
        );
        params.insert("type".into(), json!(self.kind.as_str()));

        let flags = [
            ("is_anonymous", self.anonymous),
            ("allows_multiple_answers", self.multiple_answers),
            ("is_closed", self.closed),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                params.insert(key.into(), json!(value));
            }
        }
        if let Some(period) = self.open_period {
            params.insert("open_period".into(), json!(period));
        }

        if self.kind == PollKind::Quiz {
            if let Some(index) = self.correct_option {
                params.insert("correct_option_id".into(), json!(index));
            }
            if let Some(explanation) = &self.explanation {
                params.insert("explanation".into(), json!(explanation));
                if let Some(mode) = self.explanation_parse_mode.as_param() {
                    params.insert("explanation_parse_mode".into(), json!(mode));
                }
            }
        }
        Ok(params)
    }

    pub async fn send(&self) -> BotResult<Value> {
        let params = self.params()?;
        self.bot.call("sendPoll", params).await
    }
}

impl std::fmt::Debug for Poll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poll")
            .field("kind", &self.kind)
            .field("question", &self.question)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
