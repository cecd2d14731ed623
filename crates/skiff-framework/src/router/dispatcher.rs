//! Update dispatch.
//!
//! The [`Dispatcher`] is the frozen route table. For every update it finds
//! the first matching action, in this order:
//!
//! 1. commands: `/start <payload>` (referral), bare `/start`, bot commands
//! 2. the user's FSM state
//! 3. command templates, exact text, reply-keyboard buttons, text regexes,
//!    the any-text fallback
//! 4. media fallbacks, then joined or left chat members
//! 5. callback queries: button ids, callback templates, callback regexes
//! 6. edited messages and inline queries
//! 7. the default route
//!
//! The matched action then goes through its middleware, its redirect,
//! access control, and finally its handler or declarative message.
//!
//! # Tower Service Integration
//!
//! `Dispatcher` implements `tower::Service<Bot>`:
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use tower::timeout::TimeoutLayer;
//!
//! let service = ServiceBuilder::new()
//!     .layer(TimeoutLayer::new(Duration::from_secs(30)))
//!     .service(dispatcher);
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use serde_json::Value;
use skiff_core::{BoxedApi, BoxedStorage, Params, ParseMode, UpdateContext, UpdateKind, UserDto};
use tower::Service;
use tracing::{Instrument, debug, error, info_span, trace};

use super::{Next, RouteTable, Slot};
use crate::action::Action;
use crate::bot::Bot;
use crate::error::{BotError, DispatchError, DispatchResult, SetupError};
use crate::file::{FileRef, file_id_from};
use crate::handler::{BoxFuture, Handler, RouteArgs, RouteValue};
use crate::message::ButtonRegistry;
use crate::report::ErrorReporter;
use crate::resolver::DependencyResolver;

/// How an action was reached; decides the declarative behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Commands, text, fallbacks.
    Message,
    /// A reply-keyboard press.
    TextButton,
    State,
    /// An inline press on a registered button.
    Button,
    Callback,
    Inline,
}

pub(super) struct Parts {
    pub table: RouteTable,
    pub buttons: Arc<ButtonRegistry>,
    pub middleware: Option<Handler>,
    pub resolver: DependencyResolver,
    pub storage: Option<BoxedStorage>,
    pub reporter: Option<Arc<dyn ErrorReporter>>,
    pub parse_mode: ParseMode,
}

/// The immutable, shareable route table.
///
/// Cloning is cheap.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Parts>,
}

impl Dispatcher {
    pub(super) fn new(parts: Parts) -> Self {
        Self {
            inner: Arc::new(parts),
        }
    }

    /// Creates the facade for one update, wired to this dispatcher's
    /// storage, buttons and parse mode.
    pub fn bot(&self, api: BoxedApi, update: Value) -> Bot {
        Bot::new(api, UpdateContext::new(update))
            .with_storage(self.inner.storage.clone())
            .with_buttons(Arc::clone(&self.inner.buttons))
            .with_parse_mode(self.inner.parse_mode)
    }

    pub fn find_action(&self, id: &str) -> Option<&Action> {
        self.inner.table.find(id)
    }

    pub fn resolver(&self) -> &DependencyResolver {
        &self.inner.resolver
    }

    /// Dispatches one update, then logs and reports a failure.
    ///
    /// This is what ingestion loops call per update.
    pub async fn process(&self, bot: Bot) {
        let context = bot.context_arc();
        let span = info_span!(
            "dispatch",
            update_id = context.update_id(),
            kind = %context.kind()
        );

        async {
            if let Err(e) = self.dispatch(bot.clone()).await {
                error!(error = %e, "Update processing failed");
                if let Some(reporter) = &self.inner.reporter {
                    reporter.report(&bot, &e).await;
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Dispatches one update through the global middleware and the routes.
    pub async fn dispatch(&self, bot: Bot) -> DispatchResult {
        let Some(middleware) = &self.inner.middleware else {
            return self.route(&bot).await;
        };

        let dispatcher = self.clone();
        let routed = bot.clone();
        let next = Next::new(move || async move { dispatcher.route(&routed).await }.boxed());

        self.invoke(middleware, &bot, &RouteArgs::new(), Some(next))
            .await
    }

    /// Executes the action `id` directly, skipping matching, middleware and
    /// access control.
    pub async fn run_action(&self, bot: Bot, id: &str) -> DispatchResult {
        let action = self
            .find_action(id)
            .ok_or_else(|| SetupError::ActionNotFound(id.to_string()))?;
        self.execute(action, &bot, &RouteArgs::new()).await
    }

    // ========================================================================
    // Matching
    // ========================================================================

    async fn route(&self, bot: &Bot) -> DispatchResult {
        let table = &self.inner.table;
        let context = bot.context();
        let kind = context.kind();
        let text = context.text().unwrap_or_default();

        // Commands
        if kind == UpdateKind::BotCommand || (kind == UpdateKind::Text && text.starts_with('/')) {
            let lowered = text.to_lowercase();

            if let Some(action) = table.slots.get(&Slot::Referral)
                && lowered.starts_with("/start ")
            {
                let payload = text.get(7..).unwrap_or(&lowered[7..]).trim();
                let args = RouteArgs::positional_from([payload]);
                return self.answer(bot, action, Origin::Message, args).await;
            }

            if let Some(action) = table.slots.get(&Slot::Start)
                && lowered == "/start"
            {
                return self.answer(bot, action, Origin::Message, RouteArgs::new()).await;
            }

            let first = lowered.split_whitespace().next().unwrap_or_default();
            let command = first.split('@').next().unwrap_or_default();
            if let Some(route) = table
                .bot_commands
                .iter()
                .find(|route| route.matches(command).is_some())
            {
                let rest = text.split_once(' ').map_or("", |(_, rest)| rest);
                let args = RouteArgs::positional_from([rest]);
                return self.answer(bot, &route.action, Origin::Message, args).await;
            }
        }

        // State
        if let Some(storage) = bot.storage()
            && let Some(user_id) = context.user_id()
            && !table.states.is_empty()
            && let Some(state) = storage.get_state(user_id).await.map_err(BotError::from)?
            && let Some(action) = table.states.get(&state)
        {
            let mut args = RouteArgs::new();
            if let Some(input) = context.text().or(context.callback_data()) {
                args.push(input);
            }
            return self.answer(bot, action, Origin::State, args).await;
        }

        if matches!(kind, UpdateKind::Text | UpdateKind::BotCommand) {
            if !text.is_empty() {
                if let Some((action, args)) = first_match(&table.commands, text) {
                    return self.answer(bot, action, Origin::Message, args).await;
                }
                if let Some((action, args)) = first_match(&table.texts, text) {
                    return self.answer(bot, action, Origin::Message, args).await;
                }
                if let Some(action) = table
                    .buttons
                    .iter()
                    .find(|action| action.conditions().iter().any(|label| label == text))
                {
                    return self
                        .answer(bot, action, Origin::TextButton, RouteArgs::new())
                        .await;
                }
                if let Some((action, args)) = first_match(&table.text_patterns, text) {
                    return self.answer(bot, action, Origin::Message, args).await;
                }
                if let Some(action) = table.slots.get(&Slot::Message) {
                    return self.answer(bot, action, Origin::Message, RouteArgs::new()).await;
                }
            }

            if let Some(message) = context.message() {
                for (slot, field) in Slot::MEDIA {
                    let Some(action) = table.slots.get(&slot) else {
                        continue;
                    };
                    if !is_present(message.get(field)) {
                        continue;
                    }
                    let Some(file_id) = file_id_from(context.raw(), Some(field)) else {
                        continue;
                    };
                    let file = FileRef::new(file_id, Arc::clone(bot.api()));
                    let mut args = RouteArgs::new();
                    args.insert("file", RouteValue::File(file.clone()));
                    args.push(RouteValue::File(file));
                    return self.answer(bot, action, Origin::Message, args).await;
                }

                if let Some(action) = table.slots.get(&Slot::NewChatMember)
                    && is_present(message.get("new_chat_members"))
                {
                    let members: Vec<UserDto> =
                        serde_json::from_value(message["new_chat_members"].clone())
                            .map_err(|e| BotError::Api(e.into()))?;
                    let mut args = RouteArgs::new();
                    args.insert("members", RouteValue::Users(members.clone()));
                    args.push(RouteValue::Users(members));
                    return self.answer(bot, action, Origin::Message, args).await;
                }

                if let Some(action) = table.slots.get(&Slot::LeftChatMember)
                    && is_present(message.get("left_chat_member"))
                {
                    let member: UserDto =
                        serde_json::from_value(message["left_chat_member"].clone())
                            .map_err(|e| BotError::Api(e.into()))?;
                    let mut args = RouteArgs::new();
                    args.insert("member", RouteValue::User(member.clone()));
                    args.push(RouteValue::User(member));
                    return self.answer(bot, action, Origin::Message, args).await;
                }
            }
        }

        if kind == UpdateKind::CallbackQuery
            && let Some(data) = context.callback_data()
        {
            if let Some(action) = table.buttons.iter().find(|action| action.id() == data) {
                return self.answer(bot, action, Origin::Button, RouteArgs::new()).await;
            }
            if let Some((action, args)) = first_match(&table.callbacks, data) {
                return self.answer(bot, action, Origin::Callback, args).await;
            }
            if let Some((action, args)) = first_match(&table.callback_patterns, data) {
                return self.answer(bot, action, Origin::Callback, args).await;
            }
        }

        if kind == UpdateKind::EditedMessage
            && let Some(action) = table.slots.get(&Slot::EditedMessage)
        {
            return self.answer(bot, action, Origin::Message, RouteArgs::new()).await;
        }

        if kind == UpdateKind::InlineQuery
            && let Some(action) = table.slots.get(&Slot::Inline)
        {
            return self.answer(bot, action, Origin::Inline, RouteArgs::new()).await;
        }

        if let Some(action) = table.slots.get(&Slot::Default) {
            return self.answer(bot, action, Origin::Message, RouteArgs::new()).await;
        }

        trace!("No route matched");
        Ok(())
    }

    // ========================================================================
    // Answering
    // ========================================================================

    /// Runs `action`, wrapped in its middleware when it has one.
    fn answer<'a>(
        &'a self,
        bot: &'a Bot,
        action: &'a Action,
        origin: Origin,
        args: RouteArgs,
    ) -> BoxFuture<'a, DispatchResult> {
        async move {
            debug!(action = action.id(), ?origin, "Route matched");

            let Some(middleware) = action.middleware_handler() else {
                return self.process_answer(bot, action, origin, &args).await;
            };

            let dispatcher = self.clone();
            let routed = bot.clone();
            let target = action.clone();
            let forwarded = args.clone();
            let next = Next::new(move || {
                async move {
                    dispatcher
                        .process_answer(&routed, &target, origin, &forwarded)
                        .await
                }
                .boxed()
            });

            self.invoke(middleware, bot, &args, Some(next)).await
        }
        .boxed()
    }

    async fn process_answer(
        &self,
        bot: &Bot,
        action: &Action,
        origin: Origin,
        args: &RouteArgs,
    ) -> DispatchResult {
        let context = bot.context();
        let is_callback = context.is_callback()
            && matches!(origin, Origin::Button | Origin::Callback | Origin::State);

        if let Some(target_id) = action.redirect_to() {
            let target = self
                .find_action(target_id)
                .ok_or_else(|| SetupError::RedirectTarget(target_id.to_string()))?;
            if context.query_id().is_some()
                && let Some(text) = action.query()
            {
                bot.answer_callback_query(Some(text), Params::new()).await?;
            }
            return self.execute(target, bot, args).await;
        }

        if let Some(user_id) = context.user_id()
            && let Some(list) = action.rejecting_list(user_id)
        {
            debug!(action = action.id(), user_id, "Access denied");
            if let Some(handler) = &list.handler {
                return self.invoke(handler, bot, args, None).await;
            }
            return Ok(());
        }

        if let Some(handler) = action.handler() {
            if is_callback && let Some(text) = action.query() {
                bot.answer_callback_query(Some(text), Params::new()).await?;
            }
            return self.invoke(handler, bot, args, None).await;
        }

        // A bare button hands over to a callback route listening on its id.
        if origin == Origin::Button
            && action.draft().is_empty()
            && let Some(data) = context.callback_data()
            && let Some(route) = self
                .inner
                .table
                .callbacks
                .iter()
                .find(|route| route.action.conditions().iter().any(|c| c == data))
        {
            return self
                .answer(bot, &route.action, Origin::Callback, RouteArgs::new())
                .await;
        }

        if is_callback {
            bot.answer_callback_query(action.query(), Params::new()).await?;
        }

        if origin == Origin::Inline {
            return Ok(());
        }
        self.send(bot, action).await
    }

    /// Handler or declarative message of `action`, nothing else.
    async fn execute(&self, action: &Action, bot: &Bot, args: &RouteArgs) -> DispatchResult {
        match action.handler() {
            Some(handler) => self.invoke(handler, bot, args, None).await,
            None => self.send(bot, action).await,
        }
    }

    async fn send(&self, bot: &Bot, action: &Action) -> DispatchResult {
        if action.draft().is_empty() {
            return Ok(());
        }
        bot.send_draft(action.draft(), action.message_action()).await?;
        Ok(())
    }

    async fn invoke(
        &self,
        handler: &Handler,
        bot: &Bot,
        args: &RouteArgs,
        next: Option<Next>,
    ) -> DispatchResult {
        let resolved = self.inner.resolver.resolve(handler, bot, args, next).await?;
        handler.invoke(bot.clone(), resolved).await
    }
}

fn first_match<'a>(routes: &'a [super::Route], input: &str) -> Option<(&'a Action, RouteArgs)> {
    routes
        .iter()
        .find_map(|route| route.matches(input).map(|args| (&route.action, args)))
}

/// Non-null and, for arrays, non-empty.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("actions", &self.inner.table.actions().count())
            .field("middleware", &self.inner.middleware.is_some())
            .finish()
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

impl Service<Bot> for Dispatcher {
    type Response = ();
    type Error = DispatchError;
    type Future = BoxFuture<'static, Result<(), DispatchError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, bot: Bot) -> Self::Future {
        let dispatcher = self.clone();
        async move { dispatcher.dispatch(bot).await }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageBuilder;
    use crate::router::Router;
    use crate::storage::MemoryStorage;
    use crate::testing::RecordingApi;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use skiff_core::StateStorage;
    use tower::ServiceExt;

    const USER: i64 = 5;
    const CHAT: i64 = 9;

    fn text_update(text: &str) -> Value {
        json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "date": 0,
                "from": {"id": USER, "is_bot": false, "first_name": "Eve"},
                "chat": {"id": CHAT, "type": "private"},
                "text": text
            }
        })
    }

    fn command_update(text: &str) -> Value {
        let mut update = text_update(text);
        let length = text.split_whitespace().next().unwrap_or_default().len();
        update["message"]["entities"] = json!([{"offset": 0, "length": length, "type": "bot_command"}]);
        update
    }

    fn callback_update(data: &str) -> Value {
        json!({
            "update_id": 2,
            "callback_query": {
                "id": "q1",
                "from": {"id": USER, "is_bot": false, "first_name": "Eve"},
                "message": {"message_id": 11, "date": 0, "chat": {"id": CHAT, "type": "private"}},
                "data": data
            }
        })
    }

    /// Values seen by handlers, in call order.
    #[derive(Clone, Default)]
    struct Seen(Arc<Mutex<Vec<String>>>);

    impl Seen {
        fn push(&self, value: impl ToString) {
            self.0.lock().push(value.to_string());
        }

        fn values(&self) -> Vec<String> {
            self.0.lock().clone()
        }
    }

    async fn run(dispatcher: &Dispatcher, api: &RecordingApi, update: Value) -> DispatchResult {
        let bot = dispatcher.bot(Arc::new(api.clone()), update);
        dispatcher.dispatch(bot).await
    }

    #[tokio::test]
    async fn test_referral_keeps_payload_case() {
        let seen = Seen::default();
        let mut router = Router::new();
        let s = seen.clone();
        router.on_referral().func(move |payload: String| {
            let s = s.clone();
            async move { s.push(payload) }
        });
        router.on_start().text("Welcome");
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        run(&dispatcher, &api, command_update("/start Promo42")).await.unwrap();
        assert_eq!(seen.values(), ["Promo42"]);
        assert!(api.calls().is_empty());

        run(&dispatcher, &api, command_update("/start")).await.unwrap();
        let (method, params) = api.last_call().unwrap();
        assert_eq!(method, "sendMessage");
        assert_eq!(params["text"], "Welcome");
        assert_eq!(params["chat_id"], CHAT);
    }

    #[tokio::test]
    async fn test_bot_command_strips_bot_name() {
        let seen = Seen::default();
        let mut router = Router::new();
        let s = seen.clone();
        router.on_bot_command("/help").func(move |rest: String| {
            let s = s.clone();
            async move { s.push(rest) }
        });
        let dispatcher = router.into_dispatcher().unwrap();

        run(&dispatcher, &RecordingApi::new(), command_update("/HELP@MyBot Topic"))
            .await
            .unwrap();
        assert_eq!(seen.values(), ["Topic"]);
    }

    #[tokio::test]
    async fn test_command_template_binds_arguments() {
        let seen = Seen::default();
        let mut router = Router::new();
        let s = seen.clone();
        router.on_command("/ban %n").func(move |user_id: i64| {
            let s = s.clone();
            async move { s.push(user_id) }
        });
        router.on_message().text("fallback");
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        run(&dispatcher, &api, text_update("/ban 42")).await.unwrap();
        assert_eq!(seen.values(), ["42"]);

        run(&dispatcher, &api, text_update("/ban nobody")).await.unwrap();
        assert_eq!(api.last_call().unwrap().1["text"], "fallback");
    }

    #[tokio::test]
    async fn test_state_takes_priority_over_text() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_state(USER, "ask_name").await.unwrap();

        let seen = Seen::default();
        let mut router = Router::new();
        let s = seen.clone();
        router.on_state("ask_name").func(move |input: String| {
            let s = s.clone();
            async move { s.push(input) }
        });
        router.on_text("Bob").text("text route");
        router.storage(storage.clone());
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        run(&dispatcher, &api, text_update("Bob")).await.unwrap();
        assert_eq!(seen.values(), ["Bob"]);
        assert!(api.calls().is_empty());

        storage.clear_state(USER).await.unwrap();
        run(&dispatcher, &api, text_update("Bob")).await.unwrap();
        assert_eq!(api.last_call().unwrap().1["text"], "text route");
    }

    #[tokio::test]
    async fn test_access_control() {
        let seen = Seen::default();
        let mut router = Router::new();
        router.on_text("secret").access([1]).text("classified");
        let s = seen.clone();
        router.on_text("vault").no_access_with([USER], move || {
            let s = s.clone();
            async move { s.push("denied") }
        });
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        run(&dispatcher, &api, text_update("secret")).await.unwrap();
        assert!(api.calls().is_empty());

        run(&dispatcher, &api, text_update("vault")).await.unwrap();
        assert_eq!(seen.values(), ["denied"]);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_callback_popup_comes_before_handler() {
        let mut router = Router::new();
        router
            .on_callback("buy_%n")
            .query_text("Done")
            .func(|bot: Bot, id: i64| async move {
                bot.reply(format!("bought {id}")).await.map(|_| ())
            });
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        run(&dispatcher, &api, callback_update("buy_7")).await.unwrap();

        assert_eq!(api.methods(), ["answerCallbackQuery", "sendMessage"]);
        let calls = api.calls();
        assert_eq!(calls[0].1["text"], "Done");
        assert_eq!(calls[1].1["text"], "bought 7");
    }

    #[tokio::test]
    async fn test_declarative_callback_answers_then_sends() {
        let mut router = Router::new();
        router.on_callback("about").text("About us");
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        run(&dispatcher, &api, callback_update("about")).await.unwrap();
        assert_eq!(api.methods(), ["answerCallbackQuery", "sendMessage"]);
    }

    #[tokio::test]
    async fn test_buttons() {
        let seen = Seen::default();
        let mut router = Router::new();
        router.btn("menu", "📋 Menu");
        let s = seen.clone();
        router.on_callback(("open_menu", ["menu"])).func(move || {
            let s = s.clone();
            async move { s.push("menu") }
        });
        router.btn("info", "ℹ️ Info").text("Info text");
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        // A bare button hands over without answering twice.
        run(&dispatcher, &api, callback_update("menu")).await.unwrap();
        assert_eq!(seen.values(), ["menu"]);
        assert!(api.calls().is_empty());

        run(&dispatcher, &api, callback_update("info")).await.unwrap();
        assert_eq!(api.methods(), ["answerCallbackQuery", "sendMessage"]);

        // Reply-keyboard press by label.
        run(&dispatcher, &api, text_update("ℹ️ Info")).await.unwrap();
        assert_eq!(api.methods().len(), 3);
        assert_eq!(api.last_call().unwrap().1["text"], "Info text");
    }

    #[tokio::test]
    async fn test_global_middleware_wraps_routes() {
        let seen = Seen::default();
        let mut router = Router::new();
        let s = seen.clone();
        router.middleware(move |bot: Bot, next: Next| {
            let s = s.clone();
            async move {
                s.push("before");
                if bot.text() == Some("blocked") {
                    return Ok(());
                }
                next.run().await
            }
        });
        let s = seen.clone();
        router.on_message().func(move || {
            let s = s.clone();
            async move { s.push("handler") }
        });
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        run(&dispatcher, &api, text_update("hello")).await.unwrap();
        assert_eq!(seen.values(), ["before", "handler"]);

        run(&dispatcher, &api, text_update("blocked")).await.unwrap();
        assert_eq!(seen.values(), ["before", "handler", "before"]);
    }

    #[tokio::test]
    async fn test_action_middleware() {
        let mut router = Router::new();
        router
            .on_text("ping")
            .text("pong")
            .middleware(|bot: Bot, next: Next| async move {
                bot.send_action(skiff_core::ChatAction::Typing).await?;
                next.run().await
            });
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        run(&dispatcher, &api, text_update("ping")).await.unwrap();
        assert_eq!(api.methods(), ["sendChatAction", "sendMessage"]);
    }

    #[tokio::test]
    async fn test_action_redirect_runs_target() {
        let seen = Seen::default();
        let mut router = Router::new();
        router.on_text("old").redirect("new");
        let s = seen.clone();
        router.on_text("new").func(move || {
            let s = s.clone();
            async move { s.push("new") }
        });
        let dispatcher = router.into_dispatcher().unwrap();

        run(&dispatcher, &RecordingApi::new(), text_update("old")).await.unwrap();
        assert_eq!(seen.values(), ["new"]);
    }

    #[tokio::test]
    async fn test_media_and_member_slots() {
        let seen = Seen::default();
        let mut router = Router::new();
        let s = seen.clone();
        router.on_photo().func(move |file: FileRef| {
            let s = s.clone();
            async move { s.push(file.id()) }
        });
        let s = seen.clone();
        router.on_new_chat_member().func(move |members: Vec<UserDto>| {
            let s = s.clone();
            async move { s.push(members.len()) }
        });
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        let photo = json!({
            "message": {
                "message_id": 1,
                "date": 0,
                "chat": {"id": CHAT, "type": "private"},
                "photo": [{"file_id": "small"}, {"file_id": "large"}]
            }
        });
        run(&dispatcher, &api, photo).await.unwrap();

        let joined = json!({
            "message": {
                "message_id": 2,
                "date": 0,
                "chat": {"id": CHAT, "type": "group"},
                "new_chat_members": [
                    {"id": 1, "is_bot": false, "first_name": "A"},
                    {"id": 2, "is_bot": false, "first_name": "B"}
                ]
            }
        });
        run(&dispatcher, &api, joined).await.unwrap();

        assert_eq!(seen.values(), ["large", "2"]);
    }

    #[tokio::test]
    async fn test_inline_and_default_slots() {
        let mut router = Router::new();
        router.on_inline().text("never sent");
        router.on_default().text("Unknown command");
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        let inline = json!({
            "inline_query": {"id": "iq", "from": {"id": USER, "is_bot": false, "first_name": "Eve"}, "query": "cats"}
        });
        run(&dispatcher, &api, inline).await.unwrap();
        assert!(api.calls().is_empty());

        run(&dispatcher, &api, text_update("whatever")).await.unwrap();
        assert_eq!(api.last_call().unwrap().1["text"], "Unknown command");
    }

    #[tokio::test]
    async fn test_unmatched_update_is_ignored() {
        let dispatcher = Router::new().into_dispatcher().unwrap();
        let api = RecordingApi::new();
        run(&dispatcher, &api, text_update("hello")).await.unwrap();
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_action() {
        let mut router = Router::new();
        router.on_text("menu").access([1]).text("Main menu");
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        // Access control is skipped.
        let bot = dispatcher.bot(Arc::new(api.clone()), callback_update("x"));
        dispatcher.run_action(bot.clone(), "menu").await.unwrap();
        assert_eq!(api.last_call().unwrap().1["text"], "Main menu");

        let err = dispatcher.run_action(bot, "missing").await.unwrap_err();
        assert!(matches!(err, DispatchError::Setup(SetupError::ActionNotFound(id)) if id == "missing"));
    }

    struct Collect(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl ErrorReporter for Collect {
        async fn report(&self, _bot: &Bot, error: &DispatchError) {
            self.0.lock().push(error.to_string());
        }
    }

    #[tokio::test]
    async fn test_process_reports_failures() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();
        router.on_text("fail").func(|| async { Err::<(), _>("boom") });
        router.error_reporter(Arc::new(Collect(Arc::clone(&reports))));
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        let bot = dispatcher.bot(Arc::new(api.clone()), text_update("fail"));
        dispatcher.process(bot).await;

        assert_eq!(reports.lock().as_slice(), ["handler failed: boom"]);
    }

    #[tokio::test]
    async fn test_remote_error_surfaces() {
        let mut router = Router::new();
        router.on_text("hi").text("hello");
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();
        api.fail("sendMessage", 400, "Bad Request: chat not found");

        let err = run(&dispatcher, &api, text_update("hi")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Bot(BotError::Api(_))));
    }

    #[tokio::test]
    async fn test_tower_service() {
        let mut router = Router::new();
        router.on_text("hi").text("hello");
        let dispatcher = router.into_dispatcher().unwrap();
        let api = RecordingApi::new();

        let bot = dispatcher.bot(Arc::new(api.clone()), text_update("hi"));
        dispatcher.clone().oneshot(bot).await.unwrap();
        assert_eq!(api.methods(), ["sendMessage"]);
    }

    #[test]
    fn test_service_always_ready() {
        let mut dispatcher = Router::new().into_dispatcher().unwrap();
        let mut task = tokio_test::task::spawn(());
        task.enter(|cx, _| {
            tokio_test::assert_ready_ok!(dispatcher.poll_ready(cx));
        });
    }
}
