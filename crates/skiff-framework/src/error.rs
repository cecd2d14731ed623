//! Error types for the skiff framework.
//!
//! Setup errors ([`SetupError`]) describe a misconfigured route table and
//! are surfaced by [`Router::into_dispatcher`](crate::Router::into_dispatcher)
//! before any update is processed. Everything that can go wrong while a
//! single update is handled ends up in a [`DispatchError`], which fails that
//! update's task and nothing else.

use skiff_core::{ApiError, StorageError};
use thiserror::Error;

/// Error returned by user handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Extraction
// =============================================================================

/// A resolved argument could not be converted into the parameter type.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The argument has a different shape than the parameter expects.
    #[error("argument type mismatch: expected '{expected}', got '{got}'")]
    Mismatch {
        /// Parameter type.
        expected: &'static str,
        /// Kind of value that was resolved.
        got: &'static str,
    },

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

// =============================================================================
// Resolution
// =============================================================================

/// No value could be found for a handler parameter.
#[derive(Debug, Clone, Error)]
#[error("could not find value for argument {param} (type: {ty}) in handler {handler}")]
pub struct ResolveError {
    /// Parameter name, or `#index` when the name is unknown.
    pub param: String,
    /// Declared parameter type.
    pub ty: String,
    /// Handler identity.
    pub handler: String,
}

/// A service locator lookup failed.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// Nothing is registered under the type name.
    #[error("service '{0}' not found")]
    NotFound(String),

    /// The service exists but could not be produced.
    #[error("service '{name}' unavailable: {reason}")]
    Unavailable {
        /// Type name that was requested.
        name: String,
        /// Why construction failed.
        reason: String,
    },
}

// =============================================================================
// Setup
// =============================================================================

/// Route table misconfiguration.
#[derive(Debug, Clone, Error)]
pub enum SetupError {
    /// `redirect(from, to)` names an unknown source action.
    #[error("redirect source action '{0}' not found")]
    RedirectSource(String),

    /// A redirect names an unknown target action.
    #[error("redirect target action '{0}' not found")]
    RedirectTarget(String),

    /// Redirects form a cycle.
    #[error("redirect chain starting at '{0}' does not terminate")]
    RedirectLoop(String),

    /// `run_action` was asked for an unknown id.
    #[error("Cannot run handler: Action with ID '{0}' not found.")]
    ActionNotFound(String),

    /// A keyboard references a button id that was never registered.
    #[error("button '{0}' not found")]
    UnknownButton(String),

    /// A keyboard row or button is malformed.
    #[error("malformed keyboard: {0}")]
    MalformedKeyboard(String),

    /// The attached media cannot be sent together.
    #[error("incompatible media: {0}")]
    IncompatibleMedia(String),

    /// A route pattern failed to compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as registered.
        pattern: String,
        /// Compiler error.
        reason: String,
    },
}

// =============================================================================
// Facade
// =============================================================================

/// Errors raised by the per-update [`Bot`](crate::Bot) facade.
#[derive(Debug, Clone, Error)]
pub enum BotError {
    /// The Bot API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The state store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The update does not carry the requested value.
    #[error("update has no {0}")]
    Missing(&'static str),

    /// FSM helpers were used without a configured state store.
    #[error("no state storage configured")]
    NoStorage,

    /// A message or keyboard could not be built.
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    /// A file exceeds the Bot API download limit.
    #[error("file size {size} exceeds the download limit of {limit} bytes")]
    FileTooLarge {
        /// Reported file size.
        size: u64,
        /// Maximum size accepted.
        limit: u64,
    },
}

// =============================================================================
// Pagination
// =============================================================================

/// Invalid pagination configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("items per page must be at least 1, got {0}")]
    PerPage(usize),

    #[error("page must not be negative, got {0}")]
    Page(i64),

    #[error("columns must be between 1 and 8, got {0}")]
    Columns(usize),

    #[error("page button count must be between 1 and 8, got {0}")]
    MaxPageButtons(usize),

    #[error("callback prefix must not be empty")]
    EmptyPrefix,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Why processing one update failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Bot(#[from] BotError),

    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Handler(HandlerError),
}

impl DispatchError {
    /// Wraps a handler error.
    pub fn handler(err: impl Into<HandlerError>) -> Self {
        Self::Handler(err.into())
    }
}

impl From<ApiError> for DispatchError {
    fn from(err: ApiError) -> Self {
        Self::Bot(BotError::Api(err))
    }
}

/// Result type for facade operations.
pub type BotResult<T> = Result<T, BotError>;

/// Result type for dispatching one update.
pub type DispatchResult<T = ()> = Result<T, DispatchError>;
