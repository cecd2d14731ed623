//! # skiff
//!
//! A type-safe, async framework for Telegram bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  raw update  ┌────────────┐  Bot facade  ┌──────────────────────┐
//! │  LongPoller  │─────────────▶│  Runtime   │─────────────▶│ Dispatcher           │
//! │  Webhook     │              │ (1 task    │              │  route → middleware  │
//! └──────────────┘              │ per update)│              │  → access → handler  │
//!                               └────────────┘              └──────────┬───────────┘
//!                                                                      │ Bot API calls
//!                                                                      ▼
//!                                                               HttpApiClient
//! ```
//!
//! - **Router**: registration of actions for commands, text, buttons,
//!   callbacks, FSM states and media, frozen into a **Dispatcher**
//! - **Handlers**: async closures or `#[handler]` functions whose parameters
//!   are filled from route captures, framework objects and services
//! - **Messages**: a fluent draft that picks the right send method
//! - **Runtime**: configuration, logging and ingestion
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use skiff::prelude::*;
//!
//! #[handler]
//! async fn greet(name: String) -> String {
//!     format!("Hello, {name}!")
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = SkiffRuntime::builder().build()?;
//!
//!     let mut router = Router::new();
//!     router.on_start().text("Welcome!");
//!     router.on_command(("greet", ["/greet {name}"])).func(greet);
//!
//!     runtime.run_polling(runtime.dispatcher(router).await?).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*, `yaml-config`: configuration file formats
//! - `http-client` *(default)*: the reqwest Bot API client
//! - `webhook`: the axum webhook server
//! - `json-log`: JSON log lines
//! - `redis`: redis state storage

pub use skiff_core as core;
pub use skiff_framework as framework;
pub use skiff_macros::handler;
pub use skiff_runtime as runtime;
pub use skiff_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use skiff::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use skiff_runtime::{RuntimeError, SkiffConfig, SkiffRuntime};

    // Routing
    pub use skiff_framework::{Action, Dispatcher, Next, Router};

    // Handlers and their parameters
    pub use skiff_framework::{Bot, FileRef, RouteArgs, Service, ServiceRegistry};
    pub use skiff_macros::handler;

    // Outbound helpers
    pub use skiff_framework::{
        InlineKind, InlineResult, Message, MessageBuilder, NumberStyle, Pagination, PaginationLayout,
        PaginationMode, Poll, PollKind,
    };

    // Errors
    pub use skiff_framework::{BotError, BotResult, HandlerError};

    // Bot API types
    pub use skiff_core::{
        Button, ChatAction, ChatDto, Dice, Key, MessageDto, ParseMode, UpdateContext, UserDto,
        keyboard,
    };

    // Logging
    pub use skiff_runtime::prelude::*;
}
