//! Handler system for the skiff framework.
//!
//! A [`Handler`] is a type-erased value carrying three things: an identity
//! key, a provider of its parameter binding specs, and an invocation thunk
//! taking already-resolved arguments. The router stores handlers, the
//! [`DependencyResolver`](crate::DependencyResolver) turns an update into an
//! argument list using the specs, and the thunk converts and calls.
//!
//! Anything implementing [`IntoHandler`] can be registered:
//!
//! - async closures and functions of 0-12 [`FromArg`] parameters; their
//!   parameters are unnamed, so they bind by type and position
//! - functions annotated with `#[handler]`, whose parameter names and
//!   `#[default(...)]` values take part in binding
//!
//! # Example
//!
//! ```rust,ignore
//! // Bound by type and position
//! router.on_command("/ban %n").func(|bot: Bot, user_id: i64| async move {
//!     bot.reply(format!("banned {user_id}")).await
//! });
//!
//! // Bound by name
//! #[handler]
//! async fn show_page(bot: Bot, page: i64, #[default(10)] per_page: i64) -> String {
//!     format!("page {page} ({per_page} per page)")
//! }
//! router.on_callback("list_{page}").func(show_page);
//! ```

mod extractor;
mod param;
mod response;

use std::any::type_name;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::Location;
use std::sync::Arc;

use futures::FutureExt;
pub use futures::future::BoxFuture;

pub use extractor::{FromArg, extract};
pub use param::{
    Arg, Binding, ContextType, DeclaredType, ParamSpec, RouteArgs, RouteValue, ServiceArc,
};
pub use response::HandlerResponse;

use crate::bot::Bot;
use crate::error::{DispatchError, DispatchResult};

type Introspect = dyn Fn() -> Vec<ParamSpec> + Send + Sync;
type Thunk = dyn Fn(Bot, Vec<Arg>) -> BoxFuture<'static, DispatchResult> + Send + Sync;

// ============================================================================
// Handler
// ============================================================================

/// A registered handler.
#[derive(Clone)]
pub struct Handler {
    key: Arc<str>,
    introspect: Arc<Introspect>,
    thunk: Arc<Thunk>,
}

impl Handler {
    /// Builds a handler from its identity, spec provider and thunk.
    ///
    /// `key` must differ between handlers whose parameter specs differ:
    /// resolved metadata is cached under it.
    pub fn from_parts<I, T>(key: impl Into<Arc<str>>, introspect: I, thunk: T) -> Self
    where
        I: Fn() -> Vec<ParamSpec> + Send + Sync + 'static,
        T: Fn(Bot, Vec<Arg>) -> BoxFuture<'static, DispatchResult> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            introspect: Arc::new(introspect),
            thunk: Arc::new(thunk),
        }
    }

    /// Identity of the handler.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Derives the parameter specs. Callers should go through the resolver's cache.
    pub fn introspect(&self) -> Vec<ParamSpec> {
        (self.introspect)()
    }

    /// Invokes the handler with resolved arguments.
    pub fn invoke(&self, bot: Bot, args: Vec<Arg>) -> BoxFuture<'static, DispatchResult> {
        (self.thunk)(bot, args)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").field("key", &self.key).finish()
    }
}

/// Sends a handler's return value and maps its error.
pub async fn respond<R: HandlerResponse>(response: R, bot: &Bot) -> DispatchResult {
    response.respond(bot).await.map_err(DispatchError::Handler)
}

// ============================================================================
// IntoHandler
// ============================================================================

/// Conversion into a [`Handler`].
///
/// `M` only disambiguates the blanket implementations.
pub trait IntoHandler<M>: Send + Sync + 'static {
    /// Converts `self`; `location` is the registration call site.
    fn into_handler(self, location: &'static Location<'static>) -> Handler;
}

/// Marker for async closures and plain functions.
pub struct FnMarker<T, R>(PhantomData<fn(T) -> R>);

/// Marker for `#[handler]` functions.
pub struct NamedMarker;

/// Marker for ready-made handlers.
pub struct ErasedMarker;

impl IntoHandler<ErasedMarker> for Handler {
    fn into_handler(self, _location: &'static Location<'static>) -> Handler {
        self
    }
}

/// A handler function with named parameters, generated by `#[handler]`.
pub trait HandlerFn: Send + Sync + 'static {
    /// Module path, name and signature of the function.
    fn key(&self) -> &'static str;

    /// Parameter specs in declaration order.
    fn params(&self) -> Vec<ParamSpec>;

    /// Converts the arguments and calls the function.
    fn call(&self, bot: Bot, args: Vec<Arg>) -> BoxFuture<'static, DispatchResult>;
}

impl<H: HandlerFn> IntoHandler<NamedMarker> for H {
    fn into_handler(self, _location: &'static Location<'static>) -> Handler {
        let handler = Arc::new(self);
        let spec_source = Arc::clone(&handler);
        Handler::from_parts(
            handler.key(),
            move || spec_source.params(),
            move |bot, args| handler.call(bot, args),
        )
    }
}

/// Identity of an unnamed handler: where it was registered plus its
/// parameter types, so a key never maps to two different specs.
fn closure_key(location: &Location<'_>, types: &[&str]) -> String {
    format!(
        "{}:{}:{}({})",
        location.file(),
        location.line(),
        location.column(),
        types.join(", ")
    )
}

macro_rules! impl_into_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, R, $($ty,)*> IntoHandler<FnMarker<($($ty,)*), R>> for F
        where
            F: Fn($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: HandlerResponse,
            $( $ty: FromArg, )*
        {
            fn into_handler(self, location: &'static Location<'static>) -> Handler {
                let key = closure_key(location, &[$(type_name::<$ty>(),)*]);
                Handler::from_parts(
                    key,
                    || vec![$(ParamSpec::of::<$ty>(""),)*],
                    move |bot: Bot, args: Vec<Arg>| {
                        let f = self.clone();
                        async move {
                            let mut args = args.into_iter();
                            $(
                                let $ty = extract::<$ty>(args.next().unwrap_or(Arg::Null))?;
                            )*

                            respond(f($($ty,)*).await, &bot).await
                        }
                        .boxed()
                    },
                )
            }
        }
    };
}

// Generate implementations for 0-12 parameters
impl_into_handler!();
impl_into_handler!(T1);
impl_into_handler!(T1, T2);
impl_into_handler!(T1, T2, T3);
impl_into_handler!(T1, T2, T3, T4);
impl_into_handler!(T1, T2, T3, T4, T5);
impl_into_handler!(T1, T2, T3, T4, T5, T6);
impl_into_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_into_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_into_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_into_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_into_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_into_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingApi, bot_for};
    use serde_json::json;

    #[track_caller]
    fn handler_of<M>(h: impl IntoHandler<M>) -> Handler {
        h.into_handler(Location::caller())
    }

    #[tokio::test]
    async fn test_closure_handler_converts_arguments() {
        let handler = handler_of(|id: i64, name: Option<String>| async move {
            assert_eq!(id, 42);
            assert_eq!(name, None);
        });

        let specs = handler.introspect();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].ty, DeclaredType::Primitive("int".into()));
        assert!(specs[1].nullable);

        let api = RecordingApi::new();
        let bot = bot_for(&api, json!({"message": {"message_id": 1, "chat": {"id": 1}}}));
        handler
            .invoke(bot, vec![Arg::Route("42".into()), Arg::Null])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_string_response_replies() {
        let handler = handler_of(|| async { "pong" });
        let api = RecordingApi::new();
        let bot = bot_for(&api, json!({"message": {"message_id": 1, "chat": {"id": 9}}}));

        handler.invoke(bot, Vec::new()).await.unwrap();

        let calls = api.calls();
        assert_eq!(calls[0].0, "sendMessage");
        assert_eq!(calls[0].1["text"], "pong");
        assert_eq!(calls[0].1["chat_id"], 9);
    }

    #[tokio::test]
    async fn test_handler_error_is_propagated() {
        let handler = handler_of(|| async { Err::<(), _>("boom") });
        let api = RecordingApi::new();
        let bot = bot_for(&api, json!({"message": {"message_id": 1, "chat": {"id": 9}}}));

        let err = handler.invoke(bot, Vec::new()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Handler(_)));
    }

    #[skiff_macros::handler(crate = "crate")]
    async fn paged(page: i64, #[default(10)] per_page: i64) -> String {
        format!("{page}/{per_page}")
    }

    #[tokio::test]
    async fn test_named_handler_exposes_names_and_defaults() {
        let handler = handler_of(paged);
        assert!(handler.key().ends_with("::paged(i64, i64)"));

        let specs = handler.introspect();
        assert_eq!(specs[0].name, "page");
        assert!(!specs[0].has_default());
        assert_eq!(specs[1].name, "per_page");
        assert_eq!(specs[1].default, Some(json!(10)));

        let api = RecordingApi::new();
        let bot = bot_for(&api, json!({"message": {"message_id": 1, "chat": {"id": 9}}}));
        handler
            .invoke(bot, vec![Arg::Route("3".into()), Arg::Value(json!(10))])
            .await
            .unwrap();
        assert_eq!(api.last_call().unwrap().1["text"], "3/10");
    }

    #[test]
    fn test_keys_differ_per_call_site() {
        let a = handler_of(|_: i64| async {});
        let b = handler_of(|_: i64| async {});
        assert_ne!(a.key(), b.key());
    }
}
