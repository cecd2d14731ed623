//! The per-update bot facade.
//!
//! A [`Bot`] is created for every update and handed to handlers. It bundles
//! the API client, the update's [`UpdateContext`], the optional state store
//! and the registered buttons, and offers the everyday operations: replying,
//! building messages, answering queries, managing messages, FSM steps.
//!
//! Cloning is cheap; a facade is never shared between updates.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use skiff_core::{
    ApiError, BoxedApi, BoxedStorage, ChatAction, ChatDto, MessageDto, Params, ParseMode, Session,
    UpdateContext, UserDto,
};
use tracing::trace;

use crate::error::{BotError, BotResult};
use crate::file::FileRef;
use crate::inline::{InlineKind, InlineResult};
use crate::message::{ApiRequest, ButtonRegistry, Message, MessageAction, MessageDraft, RenderTarget};
use crate::pagination::Pagination;
use crate::poll::{Poll, PollKind};

const USER_PATHS: &[&str] = &[
    "/message/from",
    "/edited_message/from",
    "/callback_query/from",
    "/inline_query/from",
    "/my_chat_member/from",
    "/chat_member/from",
    "/chat_join_request/from",
];

const CHAT_PATHS: &[&str] = &[
    "/message/chat",
    "/edited_message/chat",
    "/channel_post/chat",
    "/edited_channel_post/chat",
    "/my_chat_member/chat",
    "/chat_member/chat",
    "/chat_join_request/chat",
    "/callback_query/message/chat",
];

const MESSAGE_PATHS: &[&str] = &[
    "/message",
    "/callback_query/message",
    "/edited_message",
    "/channel_post",
    "/edited_channel_post",
];

/// Facade over one update.
#[derive(Clone)]
pub struct Bot {
    api: BoxedApi,
    context: Arc<UpdateContext>,
    storage: Option<BoxedStorage>,
    buttons: Arc<ButtonRegistry>,
    parse_mode: ParseMode,
}

impl Bot {
    /// Creates a facade for `context`.
    pub fn new(api: BoxedApi, context: UpdateContext) -> Self {
        Self {
            api,
            context: Arc::new(context),
            storage: None,
            buttons: Arc::default(),
            parse_mode: ParseMode::None,
        }
    }

    /// Attaches the state store used by FSM helpers.
    pub fn with_storage(mut self, storage: Option<BoxedStorage>) -> Self {
        self.storage = storage;
        self
    }

    /// Attaches the registered buttons used to resolve keyboard ids.
    pub fn with_buttons(mut self, buttons: Arc<ButtonRegistry>) -> Self {
        self.buttons = buttons;
        self
    }

    /// Sets the parse mode of messages that do not choose one.
    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn api(&self) -> &BoxedApi {
        &self.api
    }

    pub fn context(&self) -> &UpdateContext {
        &self.context
    }

    pub fn context_arc(&self) -> Arc<UpdateContext> {
        Arc::clone(&self.context)
    }

    pub fn storage(&self) -> Option<&BoxedStorage> {
        self.storage.as_ref()
    }

    pub fn buttons(&self) -> &ButtonRegistry {
        &self.buttons
    }

    pub fn parse_mode(&self) -> ParseMode {
        self.parse_mode
    }

    /// The raw update.
    pub fn update(&self) -> &Value {
        self.context.raw()
    }

    pub fn chat_id(&self) -> Option<i64> {
        self.context.chat_id()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.context.user_id()
    }

    pub fn message_id(&self) -> Option<i64> {
        self.context.message_id()
    }

    pub fn text(&self) -> Option<&str> {
        self.context.text()
    }

    pub fn callback_data(&self) -> Option<&str> {
        self.context.callback_data()
    }

    pub fn query_id(&self) -> Option<&str> {
        self.context.query_id()
    }

    /// The user who caused the update.
    pub fn user(&self) -> BotResult<UserDto> {
        self.lookup(USER_PATHS, "user")
    }

    /// The chat the update happened in.
    pub fn chat(&self) -> BotResult<ChatDto> {
        self.lookup(CHAT_PATHS, "chat")
    }

    /// The message of the update (or the one a pressed button belongs to).
    pub fn message(&self) -> BotResult<MessageDto> {
        self.lookup(MESSAGE_PATHS, "message")
    }

    fn lookup<T: DeserializeOwned>(&self, paths: &[&str], what: &'static str) -> BotResult<T> {
        let raw = paths
            .iter()
            .find_map(|path| self.context.raw().pointer(path))
            .ok_or(BotError::Missing(what))?;
        serde_json::from_value(raw.clone()).map_err(|e| BotError::Api(ApiError::from(e)))
    }

    fn current_chat(&self) -> BotResult<i64> {
        self.chat_id().ok_or(BotError::Missing("chat id"))
    }

    fn current_message(&self) -> BotResult<i64> {
        self.message_id().ok_or(BotError::Missing("message id"))
    }

    // =========================================================================
    // Raw calls
    // =========================================================================

    /// Calls any Bot API method.
    pub async fn call(&self, method: &str, params: Params) -> BotResult<Value> {
        trace!(method, "Bot API call");
        Ok(self.api.call(method, params).await?)
    }

    /// Renders a draft for this update.
    pub fn render(
        &self,
        draft: &MessageDraft,
        action: MessageAction,
        chat_id: Option<i64>,
    ) -> BotResult<ApiRequest> {
        draft.build(
            action,
            &RenderTarget {
                chat_id: chat_id.or(self.chat_id()),
                message_id: self.message_id(),
                buttons: &self.buttons,
                parse_mode: self.parse_mode,
            },
        )
    }

    /// Performs a rendered request, uploading local files when present.
    pub async fn execute(&self, request: ApiRequest) -> BotResult<Value> {
        if request.files.is_empty() {
            self.call(request.method, request.params).await
        } else {
            Ok(self
                .api
                .upload(request.method, request.params, request.files)
                .await?)
        }
    }

    /// Renders and performs a draft.
    pub async fn send_draft(&self, draft: &MessageDraft, action: MessageAction) -> BotResult<Value> {
        let request = self.render(draft, action, None)?;
        self.execute(request).await
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Starts a message to the current chat.
    pub fn msg(&self, text: impl Into<String>) -> Message {
        Message::new(self.clone(), Some(text.into()))
    }

    /// Sends plain text to the current chat.
    pub async fn reply(&self, text: impl Into<String>) -> BotResult<Value> {
        let mut params = Params::new();
        params.insert("chat_id".into(), json!(self.current_chat()?));
        params.insert("text".into(), json!(text.into()));
        self.call("sendMessage", params).await
    }

    /// Sends text to `chat_id`; `extra` is merged into the request.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: impl Into<String>,
        extra: Params,
    ) -> BotResult<Value> {
        let mut params = extra;
        params.insert("chat_id".into(), json!(chat_id));
        params.insert("text".into(), json!(text.into()));
        self.call("sendMessage", params).await
    }

    /// Answers the current callback query, optionally with a popup text.
    pub async fn answer_callback_query(&self, text: Option<&str>, extra: Params) -> BotResult<Value> {
        let query_id = self
            .query_id()
            .ok_or(BotError::Missing("callback query id"))?;
        let mut params = Params::new();
        params.insert("callback_query_id".into(), json!(query_id));
        if let Some(text) = text {
            params.insert("text".into(), json!(text));
        }
        params.extend(extra);
        self.call("answerCallbackQuery", params).await
    }

    /// Answers the current inline query with `results`.
    pub async fn answer_inline_query(&self, results: Vec<Value>, extra: Params) -> BotResult<Value> {
        let query_id = self.query_id().ok_or(BotError::Missing("inline query id"))?;
        let mut params = Params::new();
        params.insert("inline_query_id".into(), json!(query_id));
        params.insert("results".into(), json!(serde_json::to_string(&results).map_err(ApiError::from)?));
        params.extend(extra);
        self.call("answerInlineQuery", params).await
    }

    /// Shows a chat action such as "typing…".
    pub async fn send_action(&self, action: ChatAction) -> BotResult<Value> {
        let mut params = Params::new();
        params.insert("chat_id".into(), json!(self.current_chat()?));
        params.insert("action".into(), json!(action.as_str()));
        self.call("sendChatAction", params).await
    }

    // =========================================================================
    // Message management
    // =========================================================================

    /// Deletes messages in the current chat; no ids means the current message.
    pub async fn del_msg(&self, ids: &[i64]) -> BotResult<Value> {
        let (method, mut params) = self.message_ids(ids, "deleteMessage", "deleteMessages")?;
        params.insert("chat_id".into(), json!(self.current_chat()?));
        self.call(method, params).await
    }

    /// Copies messages into `chat_id` (default: current chat) from
    /// `from_chat_id` (default: the destination chat).
    pub async fn copy_msg(
        &self,
        ids: &[i64],
        chat_id: Option<i64>,
        from_chat_id: Option<i64>,
        extra: Params,
    ) -> BotResult<Value> {
        self.relay(ids, chat_id, from_chat_id, extra, "copyMessage", "copyMessages")
            .await
    }

    /// Forwards messages; defaults as in [`Bot::copy_msg`].
    pub async fn fwd_msg(
        &self,
        ids: &[i64],
        chat_id: Option<i64>,
        from_chat_id: Option<i64>,
        extra: Params,
    ) -> BotResult<Value> {
        self.relay(ids, chat_id, from_chat_id, extra, "forwardMessage", "forwardMessages")
            .await
    }

    async fn relay(
        &self,
        ids: &[i64],
        chat_id: Option<i64>,
        from_chat_id: Option<i64>,
        extra: Params,
        single: &'static str,
        batch: &'static str,
    ) -> BotResult<Value> {
        let (method, mut params) = self.message_ids(ids, single, batch)?;
        let chat_id = match chat_id {
            Some(id) => id,
            None => self.current_chat()?,
        };
        params.insert("chat_id".into(), json!(chat_id));
        params.insert("from_chat_id".into(), json!(from_chat_id.unwrap_or(chat_id)));
        params.extend(extra);
        self.call(method, params).await
    }

    fn message_ids(
        &self,
        ids: &[i64],
        single: &'static str,
        batch: &'static str,
    ) -> BotResult<(&'static str, Params)> {
        let mut params = Params::new();
        let method = match ids {
            [] => {
                params.insert("message_id".into(), json!(self.current_message()?));
                single
            }
            [id] => {
                params.insert("message_id".into(), json!(id));
                single
            }
            many => {
                params.insert("message_ids".into(), json!(many));
                batch
            }
        };
        Ok((method, params))
    }

    /// Pins a message (default: the current one).
    pub async fn pin_msg(&self, message_id: Option<i64>, disable_notification: bool) -> BotResult<Value> {
        let message_id = match message_id {
            Some(id) => id,
            None => self.current_message()?,
        };
        let mut params = Params::new();
        params.insert("chat_id".into(), json!(self.current_chat()?));
        params.insert("message_id".into(), json!(message_id));
        params.insert("disable_notification".into(), json!(disable_notification));
        self.call("pinChatMessage", params).await
    }

    /// Unpins a message (default: the current one), or every message when `all`.
    pub async fn unpin_msg(&self, message_id: Option<i64>, all: bool) -> BotResult<Value> {
        let mut params = Params::new();
        params.insert("chat_id".into(), json!(self.current_chat()?));
        if all {
            return self.call("unpinAllChatMessages", params).await;
        }
        let message_id = match message_id {
            Some(id) => id,
            None => self.current_message()?,
        };
        params.insert("message_id".into(), json!(message_id));
        self.call("unpinChatMessage", params).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// File helper for `file_id`.
    pub fn file(&self, file_id: impl Into<String>) -> FileRef {
        FileRef::new(file_id, self.api.clone())
    }

    /// Poll builder sending to the current chat.
    pub fn poll(&self, kind: PollKind) -> Poll {
        Poll::new(self.clone(), kind)
    }

    /// Inline query result builder using the default parse mode.
    pub fn inline(&self, kind: InlineKind) -> InlineResult {
        InlineResult::new(kind).parse_mode(self.parse_mode)
    }

    /// Pagination keyboard builder.
    pub fn pagination(&self) -> Pagination {
        Pagination::new()
    }

    // =========================================================================
    // FSM
    // =========================================================================

    fn fsm(&self) -> BotResult<(&BoxedStorage, Option<i64>)> {
        let storage = self.storage.as_ref().ok_or(BotError::NoStorage)?;
        Ok((storage, self.user_id()))
    }

    /// Moves the user to `state`.
    pub async fn step(&self, state: &str) -> BotResult<()> {
        if let (storage, Some(user_id)) = self.fsm()? {
            storage.set_state(user_id, state).await?;
        }
        Ok(())
    }

    /// Leaves the current state, clearing the session when `clear_data`.
    pub async fn end_step(&self, clear_data: bool) -> BotResult<()> {
        if let (storage, Some(user_id)) = self.fsm()? {
            storage.clear_state(user_id).await?;
            if clear_data {
                storage.clear_session(user_id).await?;
            }
        }
        Ok(())
    }

    /// The user's current state.
    pub async fn state(&self) -> BotResult<Option<String>> {
        match self.fsm()? {
            (storage, Some(user_id)) => Ok(storage.get_state(user_id).await?),
            _ => Ok(None),
        }
    }

    /// The user's session data.
    pub async fn session(&self) -> BotResult<Session> {
        match self.fsm()? {
            (storage, Some(user_id)) => Ok(storage.get_session(user_id).await?),
            _ => Ok(Session::new()),
        }
    }

    /// Merges `data` into the session and returns the result.
    pub async fn set_session(&self, data: Session) -> BotResult<Session> {
        match self.fsm()? {
            (storage, Some(user_id)) => {
                storage.set_session(user_id, data).await?;
                Ok(storage.get_session(user_id).await?)
            }
            _ => Ok(Session::new()),
        }
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("update_id", &self.context.update_id())
            .field("kind", &self.context.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::testing::{RecordingApi, bot_for};

    fn callback_update() -> Value {
        json!({
            "update_id": 10,
            "callback_query": {
                "id": "q1",
                "from": {"id": 5, "is_bot": false, "first_name": "Eve"},
                "message": {
                    "message_id": 77,
                    "date": 0,
                    "chat": {"id": -100, "type": "supergroup", "title": "Team"}
                },
                "data": "go"
            }
        })
    }

    #[test]
    fn test_dto_accessors() {
        let api = RecordingApi::new();
        let bot = bot_for(&api, callback_update());

        assert_eq!(bot.user().unwrap().first_name, "Eve");
        assert_eq!(bot.chat().unwrap().title.as_deref(), Some("Team"));
        assert_eq!(bot.message().unwrap().message_id, 77);

        let inline = bot_for(
            &api,
            json!({"inline_query": {"id": "1", "from": {"id": 3, "is_bot": false, "first_name": "X"}, "query": ""}}),
        );
        assert!(matches!(inline.chat(), Err(BotError::Missing("chat"))));
    }

    #[tokio::test]
    async fn test_message_management_defaults() {
        let api = RecordingApi::new();
        let bot = bot_for(&api, callback_update());

        bot.del_msg(&[]).await.unwrap();
        bot.del_msg(&[1, 2]).await.unwrap();
        bot.copy_msg(&[], Some(9), None, Params::new()).await.unwrap();
        bot.unpin_msg(None, true).await.unwrap();

        let calls = api.calls();
        assert_eq!(calls[0].0, "deleteMessage");
        assert_eq!(calls[0].1["message_id"], 77);
        assert_eq!(calls[1].0, "deleteMessages");
        assert_eq!(calls[1].1["message_ids"], json!([1, 2]));
        assert_eq!(calls[2].0, "copyMessage");
        assert_eq!(calls[2].1["from_chat_id"], 9);
        assert_eq!(calls[3].0, "unpinAllChatMessages");
    }

    #[tokio::test]
    async fn test_answer_callback_query() {
        let api = RecordingApi::new();
        let bot = bot_for(&api, callback_update());

        bot.answer_callback_query(Some("Done"), Params::new()).await.unwrap();

        let (method, params) = api.last_call().unwrap();
        assert_eq!(method, "answerCallbackQuery");
        assert_eq!(params["callback_query_id"], "q1");
        assert_eq!(params["text"], "Done");
    }

    #[tokio::test]
    async fn test_fsm_requires_storage() {
        let api = RecordingApi::new();
        let bot = bot_for(&api, callback_update());
        assert!(matches!(bot.step("ask_name").await, Err(BotError::NoStorage)));

        let bot = bot.with_storage(Some(Arc::new(MemoryStorage::new())));
        bot.step("ask_name").await.unwrap();
        assert_eq!(bot.state().await.unwrap().as_deref(), Some("ask_name"));

        let mut data = Session::new();
        data.insert("name".into(), json!("Eve"));
        let session = bot.set_session(data).await.unwrap();
        assert_eq!(session["name"], "Eve");

        bot.end_step(true).await.unwrap();
        assert_eq!(bot.state().await.unwrap(), None);
        assert!(bot.session().await.unwrap().is_empty());
    }
}
