//! Unified error types for the skiff core.
//!
//! Framework-level errors (resolution, route configuration, pagination) are
//! defined in `skiff-framework`.

use thiserror::Error;

use crate::api::Params;

// =============================================================================
// Transport Errors
// =============================================================================

/// Failures below the Bot API envelope: sockets, timeouts, unreadable bodies.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("could not reach {target}: {reason}")]
    Connect { target: String, reason: String },

    #[error("'{method}' timed out")]
    Timeout { method: String },

    /// The request was sent but failed before a response body was read.
    #[error("'{method}' failed: {reason}")]
    Request { method: String, reason: String },

    /// The server answered with something that is not a Bot API envelope.
    #[error("unexpected response: {0}")]
    Malformed(String),

    /// The HTTP client could not be set up.
    #[error("invalid client setup: {0}")]
    Setup(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Error type for Bot API calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The Bot API declined the request (`ok: false` or a non-200 status).
    ///
    /// Carries the request parameters so the failing call can be diagnosed.
    #[error("Bot API method '{method}' failed ({code}): {description}")]
    Remote {
        /// Method that was called.
        method: String,
        /// `error_code` from the response, or the HTTP status.
        code: i64,
        /// `description` from the response.
        description: String,
        /// Parameters sent with the request.
        params: Params,
    },

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A local file to upload could not be read.
    #[error("file error: {0}")]
    File(String),
}

impl ApiError {
    /// Returns the remote error code, if the Bot API produced one.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` for network-level failures that the polling loop retries.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors from state/session stores and metadata caches.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Filesystem error.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Stored data could not be encoded or decoded.
    #[error("storage serialization error: {0}")]
    Serialization(String),

    /// The remote backend (e.g. Redis) failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
