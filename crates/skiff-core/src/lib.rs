//! # skiff core
//!
//! Foundation types shared by every skiff crate.
//!
//! ## Contents
//!
//! - **Update model**: [`UpdateContext`] and [`UpdateKind`], the normalized view
//!   of one inbound update
//! - **Bot API types**: user/chat/message DTOs, keyboard [`Button`]s, parse
//!   modes, chat actions and dice
//! - **Capabilities**: [`TelegramApi`] (outbound calls), [`StateStorage`]
//!   (FSM state and sessions) and [`MetadataCache`] (handler metadata)
//! - **Errors**: [`TransportError`], [`ApiError`], [`StorageError`]
//!
//! ## Layering
//!
//! ```text
//! ┌──────────────────┐   ┌─────────────────┐
//! │ skiff-transport  │   │ skiff-framework │  implement / consume the traits
//! └────────┬─────────┘   └────────┬────────┘
//!          └──────────┬───────────┘
//!             ┌───────▼──────┐
//!             │  skiff-core  │  types + capability traits
//!             └──────────────┘
//! ```

pub mod api;
pub mod error;
pub mod storage;
pub mod types;
pub mod update;

pub use api::{BoxedApi, InputFile, Params, TelegramApi, Upload, UpdateSink, to_params};
pub use error::{
    ApiError, ApiResult, StorageError, StorageResult, TransportError, TransportResult,
};
pub use storage::{BoxedCache, BoxedStorage, MetadataCache, Session, StateStorage};
pub use types::{
    Button, ChatAction, ChatDto, Dice, DiceValue, Key, MessageDto, MessageEntity, ParseMode,
    UserDto, WebAppInfo, keyboard,
};
pub use update::{UpdateContext, UpdateKind};
