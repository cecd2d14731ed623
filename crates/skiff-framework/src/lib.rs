//! # skiff framework
//!
//! Routing, dependency injection and message building on top of
//! [`skiff_core`].
//!
//! This layer provides:
//! - [`Router`] registration of [`Action`]s by command, text, callback,
//!   FSM state and update slot, frozen into a cloneable [`Dispatcher`]
//! - Handler argument binding through the [`DependencyResolver`]
//! - The per-update [`Bot`] facade with message, poll, inline and
//!   pagination builders
//! - State storage and metadata cache backends
//!
//! The dispatcher is a [`tower::Service`] over [`Bot`], so it composes with
//! tower layers when a transport wants timeouts or concurrency limits.

pub mod action;
pub mod bot;
pub mod cache;
pub mod error;
pub mod file;
pub mod handler;
pub mod inline;
pub mod message;
pub mod pagination;
pub mod poll;
pub mod report;
pub mod resolver;
pub mod router;
pub mod service;
pub mod storage;

#[cfg(test)]
mod testing;

pub use action::{AccessList, Action};
pub use bot::Bot;
pub use cache::FileMetadataCache;
pub use error::{
    BotError, BotResult, DispatchError, DispatchResult, ExtractError, HandlerError,
    PaginationError, ResolveError, ServiceError, SetupError,
};
pub use file::{FileRef, SizeUnit};
pub use handler::{
    Arg, BoxFuture, FromArg, Handler, HandlerFn, HandlerResponse, IntoHandler, ParamSpec,
    RouteArgs, RouteValue,
};
pub use inline::{InlineKind, InlineResult};
pub use message::{Message, MessageAction, MessageBuilder, MessageDraft};
pub use pagination::{NumberStyle, Pagination, PaginationLayout, PaginationMode};
pub use poll::{Poll, PollKind};
pub use report::{ChatErrorReporter, ErrorReporter};
pub use resolver::DependencyResolver;
pub use router::{Dispatcher, IntoRoute, Next, Router, Slot};
pub use service::{Service, ServiceLocator, ServiceRegistry};
pub use storage::{FileStorage, MemoryStorage};

#[cfg(feature = "redis")]
pub use storage::RedisStorage;

/// Items used by `#[handler]` expansions.
#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
