//! Registered routes.
//!
//! An [`Action`] is created by a `Router::on_*` call and configured through
//! its builder methods. It either runs a handler or, with no handler, sends
//! its declarative message draft.
//!
//! ```rust,ignore
//! router.on_bot_command("/help").text("Available commands: ...");
//!
//! router
//!     .on_bot_command("/admin")
//!     .access([ADMIN_ID])
//!     .func(admin_panel);
//! ```

use std::panic::Location;

use crate::handler::{Handler, IntoHandler};
use crate::message::{MessageAction, MessageBuilder, MessageDraft};

/// An allow or deny list with its optional override handler.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    pub ids: Vec<i64>,
    /// Runs instead of the main handler when the list rejects the user.
    pub handler: Option<Handler>,
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct Action {
    id: String,
    conditions: Vec<String>,
    handler: Option<Handler>,
    draft: MessageDraft,
    message_action: MessageAction,
    query_text: Option<String>,
    redirect_to: Option<String>,
    middleware: Option<Handler>,
    access: AccessList,
    no_access: AccessList,
}

impl Action {
    pub fn new<I, S>(id: impl Into<String>, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            conditions: conditions.into_iter().map(Into::into).collect(),
            handler: None,
            draft: MessageDraft::default(),
            message_action: MessageAction::Send,
            query_text: None,
            redirect_to: None,
            middleware: None,
            access: AccessList::default(),
            no_access: AccessList::default(),
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    /// Sets the handler run when the route matches.
    #[track_caller]
    pub fn func<M>(&mut self, handler: impl IntoHandler<M>) -> &mut Self {
        self.handler = Some(handler.into_handler(Location::caller()));
        self
    }

    /// Wraps this route in middleware receiving the route's arguments plus
    /// [`Next`](crate::Next).
    #[track_caller]
    pub fn middleware<M>(&mut self, handler: impl IntoHandler<M>) -> &mut Self {
        self.middleware = Some(handler.into_handler(Location::caller()));
        self
    }

    /// Executes the action `id` instead of this one.
    pub fn redirect(&mut self, id: impl Into<String>) -> &mut Self {
        self.redirect_to = Some(id.into());
        self
    }

    /// Popup text used when answering a callback query.
    pub fn query_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.query_text = Some(text.into());
        self
    }

    /// Only these users may use the route.
    pub fn access(&mut self, ids: impl IntoIterator<Item = i64>) -> &mut Self {
        self.access = AccessList {
            ids: ids.into_iter().collect(),
            handler: None,
        };
        self
    }

    /// Like [`Action::access`], running `handler` for everyone else.
    #[track_caller]
    pub fn access_with<M>(
        &mut self,
        ids: impl IntoIterator<Item = i64>,
        handler: impl IntoHandler<M>,
    ) -> &mut Self {
        self.access = AccessList {
            ids: ids.into_iter().collect(),
            handler: Some(handler.into_handler(Location::caller())),
        };
        self
    }

    /// These users may not use the route.
    pub fn no_access(&mut self, ids: impl IntoIterator<Item = i64>) -> &mut Self {
        self.no_access = AccessList {
            ids: ids.into_iter().collect(),
            handler: None,
        };
        self
    }

    /// Like [`Action::no_access`], running `handler` for the listed users.
    #[track_caller]
    pub fn no_access_with<M>(
        &mut self,
        ids: impl IntoIterator<Item = i64>,
        handler: impl IntoHandler<M>,
    ) -> &mut Self {
        self.no_access = AccessList {
            ids: ids.into_iter().collect(),
            handler: Some(handler.into_handler(Location::caller())),
        };
        self
    }

    /// Edits the text of the update's message instead of sending.
    pub fn edit_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.draft.text = Some(text.into());
        self.message_action = MessageAction::EditText;
        self
    }

    /// Edits the caption of the update's message instead of sending.
    pub fn edit_caption(&mut self, text: impl Into<String>) -> &mut Self {
        self.draft.text = Some(text.into());
        self.message_action = MessageAction::EditCaption;
        self
    }

    /// Replaces the media of the update's message instead of sending.
    pub fn edit_media(&mut self) -> &mut Self {
        self.message_action = MessageAction::EditMedia;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn middleware_handler(&self) -> Option<&Handler> {
        self.middleware.as_ref()
    }

    pub fn draft(&self) -> &MessageDraft {
        &self.draft
    }

    pub fn message_action(&self) -> MessageAction {
        self.message_action
    }

    /// Pending callback popup text.
    pub fn query(&self) -> Option<&str> {
        self.query_text.as_deref()
    }

    pub fn redirect_to(&self) -> Option<&str> {
        self.redirect_to.as_deref()
    }

    pub fn access_list(&self) -> &AccessList {
        &self.access
    }

    pub fn no_access_list(&self) -> &AccessList {
        &self.no_access
    }

    /// The list that rejects `user_id`, if any.
    ///
    /// A non-empty allow list rejects everyone not on it; the deny list
    /// rejects everyone on it.
    pub fn rejecting_list(&self, user_id: i64) -> Option<&AccessList> {
        if !self.access.ids.is_empty() && !self.access.ids.contains(&user_id) {
            return Some(&self.access);
        }
        if self.no_access.ids.contains(&user_id) {
            return Some(&self.no_access);
        }
        None
    }

    /// Copies what `target` does (handler, message, popup text) into `self`.
    pub(crate) fn adopt(&mut self, target: &Action) {
        self.handler = target.handler.clone();
        self.draft = target.draft.clone();
        self.message_action = target.message_action;
        self.query_text = target.query_text.clone();
    }
}

impl MessageBuilder for Action {
    fn draft_mut(&mut self) -> &mut MessageDraft {
        &mut self.draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ReplyTo;
    use skiff_core::ParseMode;

    #[test]
    fn test_constructor_and_getters() {
        let action = Action::new("test_id", ["/start"]);
        assert_eq!(action.id(), "test_id");
        assert_eq!(action.conditions(), ["/start"]);
        assert!(action.handler().is_none());
        assert_eq!(action.message_action(), MessageAction::Send);
    }

    #[test]
    fn test_access_lists() {
        let mut action = Action::new("id", ["cond"]);
        action.access_with([123, 456], || async {}).no_access([777]);

        assert_eq!(action.access_list().ids, [123, 456]);
        assert!(action.access_list().handler.is_some());
        assert_eq!(action.no_access_list().ids, [777]);

        assert!(action.rejecting_list(123).is_none());
        assert!(action.rejecting_list(999).is_some());
        // 777 is rejected by the allow list before the deny list is consulted.
        assert!(action.rejecting_list(777).unwrap().handler.is_some());
    }

    #[test]
    fn test_message_builder_integration() {
        let mut action = Action::new("id", ["cond"]);
        action.text("Hello").parse_mode(ParseMode::Html).reply_to(12345);

        let draft = action.draft();
        assert_eq!(draft.text.as_deref(), Some("Hello"));
        assert_eq!(draft.parse_mode, Some(ParseMode::Html));
        assert_eq!(draft.reply_to, Some(ReplyTo::Message(12345)));
    }

    #[test]
    fn test_edit_actions() {
        let mut action = Action::new("id", ["cond"]);

        action.edit_text("new text");
        assert_eq!(action.message_action(), MessageAction::EditText);
        assert_eq!(action.draft().text.as_deref(), Some("new text"));

        action.edit_caption("new caption");
        assert_eq!(action.message_action(), MessageAction::EditCaption);

        action.edit_media();
        assert_eq!(action.message_action(), MessageAction::EditMedia);
    }

    #[test]
    fn test_redirect_and_query() {
        let mut action = Action::new("id", ["cond"]);
        action.redirect("target_route_id").query_text("Processing...");

        assert_eq!(action.redirect_to(), Some("target_route_id"));
        assert_eq!(action.query(), Some("Processing..."));
    }

    #[test]
    fn test_middleware() {
        let mut action = Action::new("id", ["cond"]);
        action.middleware(|next: crate::Next| async move { next.run().await });
        assert!(action.middleware_handler().is_some());
    }
}
