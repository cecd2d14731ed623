//! Route registration.
//!
//! A [`Router`] collects [`Action`]s during startup and is then frozen into
//! an immutable [`Dispatcher`]:
//!
//! ```rust,ignore
//! let mut router = Router::new();
//!
//! router.btn("menu", "📋 Menu").text("Pick an option");
//! router.on_start().text("Hi!").inline_kbd(keyboard([["menu"]]));
//! router.on_command("/ban {user_id}").access([ADMIN]).func(ban);
//! router.on_callback("page_%n").func(show_page);
//! router.redirect("help_button", "help");
//!
//! let dispatcher = router.into_dispatcher()?;
//! ```
//!
//! Action ids are unique across the whole table: registering an id again
//! replaces the earlier action.

mod dispatcher;
mod middleware;
mod pattern;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::collections::HashSet;
use std::panic::Location;
use std::sync::Arc;

use skiff_core::{BoxedCache, BoxedStorage, ParseMode};
use tracing::{debug, warn};

pub use dispatcher::Dispatcher;
pub use middleware::Next;
pub use pattern::{Pattern, is_template};

use crate::action::Action;
use crate::error::SetupError;
use crate::handler::{Handler, IntoHandler, RouteArgs};
use crate::message::ButtonRegistry;
use crate::report::ErrorReporter;
use crate::resolver::DependencyResolver;
use crate::service::ServiceLocator;

/// Longest redirect chain followed before giving up.
const MAX_REDIRECT_DEPTH: usize = 32;

// ============================================================================
// Route ids and conditions
// ============================================================================

/// An action id with its match conditions.
///
/// A bare string is both the id and the only condition; a tuple names the
/// id and lists the conditions.
///
/// ```rust,ignore
/// router.on_text("Hello");
/// router.on_text(("greeting", ["Hi", "Hello"]));
/// ```
pub trait IntoRoute {
    fn into_route(self) -> (String, Vec<String>);
}

impl IntoRoute for &str {
    fn into_route(self) -> (String, Vec<String>) {
        (self.to_string(), vec![self.to_string()])
    }
}

impl IntoRoute for String {
    fn into_route(self) -> (String, Vec<String>) {
        (self.clone(), vec![self])
    }
}

impl IntoRoute for (&str, &str) {
    fn into_route(self) -> (String, Vec<String>) {
        (self.0.to_string(), vec![self.1.to_string()])
    }
}

impl<const N: usize> IntoRoute for (&str, [&str; N]) {
    fn into_route(self) -> (String, Vec<String>) {
        (
            self.0.to_string(),
            self.1.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl IntoRoute for (&str, Vec<String>) {
    fn into_route(self) -> (String, Vec<String>) {
        (self.0.to_string(), self.1)
    }
}

// ============================================================================
// Route table
// ============================================================================

/// Routes that hold at most one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Start,
    Referral,
    EditedMessage,
    Inline,
    Message,
    Sticker,
    Photo,
    Video,
    Audio,
    Voice,
    Document,
    VideoNote,
    NewChatMember,
    LeftChatMember,
    Default,
}

impl Slot {
    /// Id of the action occupying the slot.
    pub fn id(self) -> &'static str {
        match self {
            Self::Start => "start_command",
            Self::Referral => "referral_command",
            Self::EditedMessage => "edit_message",
            Self::Inline => "inline_fallback",
            Self::Message => "message_fallback",
            Self::Sticker => "sticker_fallback",
            Self::Photo => "photo_fallback",
            Self::Video => "video_fallback",
            Self::Audio => "audio_fallback",
            Self::Voice => "voice_fallback",
            Self::Document => "document_fallback",
            Self::VideoNote => "video_note_fallback",
            Self::NewChatMember => "new_chat_members",
            Self::LeftChatMember => "left_chat_member",
            Self::Default => "fallback",
        }
    }

    /// Media slots with their message field, in match order.
    pub(crate) const MEDIA: [(Slot, &'static str); 7] = [
        (Self::Photo, "photo"),
        (Self::Audio, "audio"),
        (Self::Video, "video"),
        (Self::Sticker, "sticker"),
        (Self::Voice, "voice"),
        (Self::Document, "document"),
        (Self::VideoNote, "video_note"),
    ];
}

/// An action with its compiled conditions.
#[derive(Debug, Clone)]
pub(crate) struct Route {
    pub action: Action,
    pub patterns: Vec<Pattern>,
}

impl Route {
    pub fn matches(&self, input: &str) -> Option<RouteArgs> {
        self.patterns.iter().find_map(|p| p.matches(input))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    BotCommands,
    Commands,
    Texts,
    TextPatterns,
    Callbacks,
    CallbackPatterns,
}

/// Registered actions partitioned by match discipline.
#[derive(Debug, Clone, Default)]
pub(crate) struct RouteTable {
    pub bot_commands: Vec<Route>,
    pub commands: Vec<Route>,
    pub texts: Vec<Route>,
    pub text_patterns: Vec<Route>,
    pub callbacks: Vec<Route>,
    pub callback_patterns: Vec<Route>,
    pub states: HashMap<String, Action>,
    pub slots: HashMap<Slot, Action>,
    pub buttons: Vec<Action>,
}

impl RouteTable {
    fn collection_mut(&mut self, collection: Collection) -> &mut Vec<Route> {
        match collection {
            Collection::BotCommands => &mut self.bot_commands,
            Collection::Commands => &mut self.commands,
            Collection::Texts => &mut self.texts,
            Collection::TextPatterns => &mut self.text_patterns,
            Collection::Callbacks => &mut self.callbacks,
            Collection::CallbackPatterns => &mut self.callback_patterns,
        }
    }

    fn routes(&self) -> impl Iterator<Item = &Route> {
        self.bot_commands
            .iter()
            .chain(&self.commands)
            .chain(&self.texts)
            .chain(&self.text_patterns)
            .chain(&self.callbacks)
            .chain(&self.callback_patterns)
    }

    /// Every action in lookup order: collections, states, slots, buttons.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.routes()
            .map(|route| &route.action)
            .chain(self.states.values())
            .chain(self.slots.values())
            .chain(&self.buttons)
    }

    fn actions_mut(&mut self) -> impl Iterator<Item = &mut Action> {
        self.bot_commands
            .iter_mut()
            .chain(&mut self.commands)
            .chain(&mut self.texts)
            .chain(&mut self.text_patterns)
            .chain(&mut self.callbacks)
            .chain(&mut self.callback_patterns)
            .map(|route| &mut route.action)
            .chain(self.states.values_mut())
            .chain(self.slots.values_mut())
            .chain(&mut self.buttons)
    }

    pub fn find(&self, id: &str) -> Option<&Action> {
        self.actions().find(|action| action.id() == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Action> {
        self.actions_mut().find(|action| action.id() == id)
    }

    /// Removes the action `id` wherever it lives.
    fn remove(&mut self, id: &str) -> bool {
        let mut removed = false;
        for collection in [
            Collection::BotCommands,
            Collection::Commands,
            Collection::Texts,
            Collection::TextPatterns,
            Collection::Callbacks,
            Collection::CallbackPatterns,
        ] {
            let routes = self.collection_mut(collection);
            let before = routes.len();
            routes.retain(|route| route.action.id() != id);
            removed |= routes.len() != before;
        }
        let before = self.states.len() + self.slots.len() + self.buttons.len();
        self.states.retain(|_, action| action.id() != id);
        self.slots.retain(|_, action| action.id() != id);
        self.buttons.retain(|action| action.id() != id);
        removed || before != self.states.len() + self.slots.len() + self.buttons.len()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Registration surface of the framework.
#[derive(Default)]
pub struct Router {
    table: RouteTable,
    buttons: ButtonRegistry,
    redirects: Vec<(String, String)>,
    middleware: Option<Handler>,
    services: Option<Arc<dyn ServiceLocator>>,
    cache: Option<BoxedCache>,
    storage: Option<BoxedStorage>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    parse_mode: Option<ParseMode>,
    errors: Vec<SetupError>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(
        &mut self,
        collection: Collection,
        route: impl IntoRoute,
        compile: fn(&str) -> Result<Pattern, SetupError>,
    ) -> &mut Action {
        let (id, conditions) = route.into_route();
        let mut patterns = Vec::with_capacity(conditions.len());
        for condition in &conditions {
            match compile(condition) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => {
                    warn!(action = %id, error = %e, "Rejected route condition");
                    self.errors.push(e);
                }
            }
        }
        let route = Route {
            action: Action::new(id.clone(), conditions),
            patterns,
        };

        let in_place = self
            .table
            .collection_mut(collection)
            .iter()
            .position(|existing| existing.action.id() == id);
        let replaced = match in_place {
            Some(_) => true,
            None => self.evict(&id),
        };
        if replaced {
            warn!(action = %id, "Action id registered twice, replacing the earlier action");
        }

        let routes = self.table.collection_mut(collection);
        let index = match in_place {
            Some(index) => {
                routes[index] = route;
                index
            }
            None => {
                routes.push(route);
                routes.len() - 1
            }
        };
        &mut routes[index].action
    }

    fn slot(&mut self, slot: Slot) -> &mut Action {
        if self.evict(slot.id()) {
            warn!(action = slot.id(), "Action id registered twice, replacing the earlier action");
        }
        self.table
            .slots
            .entry(slot)
            .insert_entry(Action::new(slot.id(), Vec::<String>::new()))
            .into_mut()
    }

    /// Drops every trace of `id`, including a registered button label.
    fn evict(&mut self, id: &str) -> bool {
        let had_label = self.buttons.remove(id).is_some();
        self.table.remove(id) || had_label
    }

    // ------------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------------

    /// Bot commands (`/help`), compared case-insensitively with the first
    /// word of the message. The rest of the message is the only argument.
    pub fn on_bot_command(&mut self, route: impl IntoRoute) -> &mut Action {
        self.add(Collection::BotCommands, route, |c| {
            Ok(Pattern::exact(c.to_lowercase()))
        })
    }

    /// Command templates (`/ban {user_id}`, `!roll %n`) or plain commands
    /// whose remaining words become positional arguments.
    pub fn on_command(&mut self, route: impl IntoRoute) -> &mut Action {
        self.add(Collection::Commands, route, Pattern::command)
    }

    /// Exact message text.
    pub fn on_text(&mut self, route: impl IntoRoute) -> &mut Action {
        self.add(Collection::Texts, route, |c| Ok(Pattern::exact(c)))
    }

    /// Message text matching a regular expression.
    pub fn on_text_preg(&mut self, route: impl IntoRoute) -> &mut Action {
        self.add(Collection::TextPatterns, route, Pattern::regex)
    }

    /// Callback data, exact or templated (`page_%n`, `item_{id}`).
    pub fn on_callback(&mut self, route: impl IntoRoute) -> &mut Action {
        self.add(Collection::Callbacks, route, Pattern::callback)
    }

    /// Callback data matching a regular expression.
    pub fn on_callback_preg(&mut self, route: impl IntoRoute) -> &mut Action {
        self.add(Collection::CallbackPatterns, route, Pattern::regex)
    }

    /// Any update from a user whose FSM state is `state`.
    pub fn on_state(&mut self, state: &str) -> &mut Action {
        let id = format!("state_{state}");
        if self.evict(&id) {
            warn!(action = %id, "Action id registered twice, replacing the earlier action");
        }
        let action = Action::new(id, [state]);
        match self.table.states.entry(state.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(action);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(action),
        }
    }

    /// A bare `/start`.
    pub fn on_start(&mut self) -> &mut Action {
        self.slot(Slot::Start)
    }

    /// `/start <payload>`; the payload is the only argument.
    pub fn on_referral(&mut self) -> &mut Action {
        self.slot(Slot::Referral)
    }

    /// Any text no other route matched.
    pub fn on_message(&mut self) -> &mut Action {
        self.slot(Slot::Message)
    }

    pub fn on_edit(&mut self) -> &mut Action {
        self.slot(Slot::EditedMessage)
    }

    pub fn on_inline(&mut self) -> &mut Action {
        self.slot(Slot::Inline)
    }

    // ------------------------------------------------------------------------
    // Media and members; the file or users are passed as the argument
    // ------------------------------------------------------------------------

    pub fn on_sticker(&mut self) -> &mut Action {
        self.slot(Slot::Sticker)
    }

    pub fn on_photo(&mut self) -> &mut Action {
        self.slot(Slot::Photo)
    }

    pub fn on_video(&mut self) -> &mut Action {
        self.slot(Slot::Video)
    }

    pub fn on_audio(&mut self) -> &mut Action {
        self.slot(Slot::Audio)
    }

    pub fn on_voice(&mut self) -> &mut Action {
        self.slot(Slot::Voice)
    }

    pub fn on_document(&mut self) -> &mut Action {
        self.slot(Slot::Document)
    }

    pub fn on_video_note(&mut self) -> &mut Action {
        self.slot(Slot::VideoNote)
    }

    pub fn on_new_chat_member(&mut self) -> &mut Action {
        self.slot(Slot::NewChatMember)
    }

    pub fn on_left_chat_member(&mut self) -> &mut Action {
        self.slot(Slot::LeftChatMember)
    }

    /// Everything nothing else matched.
    pub fn on_default(&mut self) -> &mut Action {
        self.slot(Slot::Default)
    }

    // ------------------------------------------------------------------------
    // Buttons and redirects
    // ------------------------------------------------------------------------

    /// Registers a button.
    ///
    /// `id` is its callback data on inline keyboards and the key used in
    /// keyboard rows; `label` is its text, matched against reply-keyboard
    /// presses.
    pub fn btn(&mut self, id: &str, label: &str) -> &mut Action {
        if self.evict(id) {
            warn!(action = id, "Action id registered twice, replacing the earlier action");
        }
        self.buttons.insert(id, label);
        self.table.buttons.push(Action::new(id, [label]));
        let index = self.table.buttons.len() - 1;
        &mut self.table.buttons[index]
    }

    /// Makes `from` behave like `to`; resolved when the dispatcher is built.
    pub fn redirect(&mut self, from: &str, to: &str) -> &mut Self {
        self.redirects.push((from.to_string(), to.to_string()));
        self
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Runs before routing; call [`Next::run`] to continue.
    #[track_caller]
    pub fn middleware<M>(&mut self, handler: impl IntoHandler<M>) -> &mut Self {
        self.middleware = Some(handler.into_handler(Location::caller()));
        self
    }

    /// Service locator consulted for non-framework parameter types.
    pub fn services(&mut self, services: Arc<dyn ServiceLocator>) -> &mut Self {
        self.services = Some(services);
        self
    }

    /// Persistent tier of the handler metadata cache.
    pub fn metadata_cache(&mut self, cache: BoxedCache) -> &mut Self {
        self.cache = Some(cache);
        self
    }

    /// State store used by `on_state` routes and FSM helpers.
    pub fn storage(&mut self, storage: BoxedStorage) -> &mut Self {
        self.storage = Some(storage);
        self
    }

    /// Receives every error that fails an update.
    pub fn error_reporter(&mut self, reporter: Arc<dyn ErrorReporter>) -> &mut Self {
        self.reporter = Some(reporter);
        self
    }

    /// Parse mode of messages that do not set one.
    pub fn parse_mode(&mut self, mode: ParseMode) -> &mut Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn find_action(&self, id: &str) -> Option<&Action> {
        self.table.find(id)
    }

    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    pub fn has_metadata_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// The parse mode set with [`Router::parse_mode`], if any.
    pub fn configured_parse_mode(&self) -> Option<ParseMode> {
        self.parse_mode
    }

    // ------------------------------------------------------------------------
    // Freeze
    // ------------------------------------------------------------------------

    /// Validates the table, resolves pending redirects and builds the
    /// dispatcher.
    pub fn into_dispatcher(mut self) -> Result<Dispatcher, SetupError> {
        if let Some(error) = std::mem::take(&mut self.errors).into_iter().next() {
            return Err(error);
        }

        self.resolve_redirects()?;

        if let Some(missing) = self
            .table
            .actions()
            .filter_map(Action::redirect_to)
            .find(|target| self.table.find(target).is_none())
        {
            return Err(SetupError::RedirectTarget(missing.to_string()));
        }

        let mut resolver = DependencyResolver::new();
        if let Some(cache) = self.cache {
            resolver = resolver.with_cache(cache);
        }
        if let Some(services) = self.services {
            resolver = resolver.with_services(services);
        }

        debug!(
            actions = self.table.actions().count(),
            buttons = self.buttons.len(),
            "Route table frozen"
        );

        Ok(Dispatcher::new(dispatcher::Parts {
            table: self.table,
            buttons: Arc::new(self.buttons),
            middleware: self.middleware,
            resolver,
            storage: self.storage,
            reporter: self.reporter,
            parse_mode: self.parse_mode.unwrap_or_default(),
        }))
    }

    fn resolve_redirects(&mut self) -> Result<(), SetupError> {
        let pending: HashMap<String, String> = self.redirects.iter().cloned().collect();

        for (from, to) in std::mem::take(&mut self.redirects) {
            if self.table.find(&from).is_none() {
                return Err(SetupError::RedirectSource(from));
            }

            let mut target = to;
            let mut seen = HashSet::from([from.clone()]);
            while let Some(next) = pending.get(&target) {
                if !seen.insert(target.clone()) || seen.len() > MAX_REDIRECT_DEPTH {
                    return Err(SetupError::RedirectLoop(from));
                }
                target = next.clone();
            }
            if target == from {
                return Err(SetupError::RedirectLoop(from));
            }

            let target = self
                .table
                .find(&target)
                .cloned()
                .ok_or(SetupError::RedirectTarget(target))?;
            if let Some(source) = self.table.find_mut(&from) {
                source.adopt(&target);
            }
            debug!(from = %from, to = target.id(), "Redirect resolved");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("actions", &self.table.actions().count())
            .field("buttons", &self.buttons.len())
            .field("redirects", &self.redirects.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageBuilder;

    #[test]
    fn test_re_registration_replaces() {
        let mut router = Router::new();
        router.on_text("hi").text("first");
        router.on_text("hi").text("second");
        router.on_callback("hi");

        assert_eq!(router.table.texts.len(), 0);
        assert_eq!(router.table.callbacks.len(), 1);
        assert_eq!(router.find_action("hi").unwrap().draft().text, None);
    }

    #[test]
    fn test_tuple_route_lists_conditions() {
        let mut router = Router::new();
        router.on_text(("greeting", ["Hi", "Hello"]));

        let action = router.find_action("greeting").unwrap();
        assert_eq!(action.conditions(), ["Hi", "Hello"]);
        assert!(router.table.texts[0].matches("Hello").is_some());
    }

    #[test]
    fn test_redirect_copies_target() {
        let mut router = Router::new();
        router.on_text("a");
        router.on_text("b").text("from b").query_text("popup");
        router.redirect("a", "b");

        let dispatcher = router.into_dispatcher().unwrap();
        let a = dispatcher.find_action("a").unwrap();
        assert_eq!(a.draft().text.as_deref(), Some("from b"));
        assert_eq!(a.query(), Some("popup"));
    }

    #[test]
    fn test_redirect_applied_twice_is_stable() {
        let mut router = Router::new();
        router.on_text("a");
        router.on_text("b").text("target");
        router.redirect("a", "b").redirect("a", "b");

        let dispatcher = router.into_dispatcher().unwrap();
        let a = dispatcher.find_action("a").unwrap();
        assert_eq!(a.draft().text.as_deref(), Some("target"));
    }

    #[test]
    fn test_redirect_chain_follows_to_the_end() {
        let mut router = Router::new();
        router.on_text("a");
        router.on_text("b");
        router.on_text("c").text("end");
        router.redirect("a", "b").redirect("b", "c");

        let dispatcher = router.into_dispatcher().unwrap();
        assert_eq!(
            dispatcher.find_action("a").unwrap().draft().text.as_deref(),
            Some("end")
        );
    }

    #[test]
    fn test_redirect_errors() {
        let mut router = Router::new();
        router.on_text("a");
        router.redirect("missing", "a");
        assert!(matches!(
            router.into_dispatcher(),
            Err(SetupError::RedirectSource(id)) if id == "missing"
        ));

        let mut router = Router::new();
        router.on_text("a");
        router.redirect("a", "missing");
        assert!(matches!(
            router.into_dispatcher(),
            Err(SetupError::RedirectTarget(id)) if id == "missing"
        ));

        let mut router = Router::new();
        router.on_text("a");
        router.on_text("b");
        router.redirect("a", "b").redirect("b", "a");
        assert!(matches!(router.into_dispatcher(), Err(SetupError::RedirectLoop(_))));
    }

    #[test]
    fn test_action_redirect_target_is_checked() {
        let mut router = Router::new();
        router.on_callback("old").redirect("nowhere");
        assert!(matches!(
            router.into_dispatcher(),
            Err(SetupError::RedirectTarget(id)) if id == "nowhere"
        ));
    }

    #[test]
    fn test_invalid_pattern_fails_setup() {
        let mut router = Router::new();
        router.on_text_preg("(broken");
        assert!(matches!(
            router.into_dispatcher(),
            Err(SetupError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_slots_and_buttons_are_findable() {
        let mut router = Router::new();
        router.on_default();
        router.on_photo();
        router.on_state("ask_age");
        router.btn("menu", "📋 Menu");

        assert!(router.find_action("fallback").is_some());
        assert!(router.find_action("photo_fallback").is_some());
        assert!(router.find_action("state_ask_age").is_some());
        assert_eq!(router.find_action("menu").unwrap().conditions(), ["📋 Menu"]);
        assert_eq!(router.buttons.label("menu"), Some("📋 Menu"));
    }

    #[test]
    fn test_slot_replaces_colliding_route() {
        let mut router = Router::new();
        router.on_text(("fallback", ["hello"])).text("text route");
        router.on_default().text("catch-all");

        assert!(router.table.texts.is_empty());
        assert_eq!(router.table.actions().filter(|a| a.id() == "fallback").count(), 1);
        assert_eq!(
            router.find_action("fallback").unwrap().draft().text.as_deref(),
            Some("catch-all")
        );

        router.on_text(("fallback", ["hello"])).text("text again");
        assert!(router.table.slots.is_empty());
        assert_eq!(
            router.find_action("fallback").unwrap().draft().text.as_deref(),
            Some("text again")
        );
    }

    #[test]
    fn test_re_registered_button_drops_label() {
        let mut router = Router::new();
        router.btn("menu", "📋 Menu");
        router.on_callback(("menu", ["open_menu"]));

        assert_eq!(router.buttons.label("menu"), None);
        assert_eq!(router.buttons.id_for_label("📋 Menu"), None);
        assert!(router.table.buttons.is_empty());

        router.btn("menu", "Menu v2");
        assert!(router.table.callbacks.is_empty());
        assert_eq!(router.buttons.label("menu"), Some("Menu v2"));
        assert_eq!(router.find_action("menu").unwrap().conditions(), ["Menu v2"]);
    }
}
