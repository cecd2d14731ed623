//! Runtime error types.

use skiff_core::{StorageError, TransportError};
use skiff_framework::SetupError;
use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors that stop the runtime from starting or running.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The router could not be frozen.
    #[error("Invalid route table: {0}")]
    Setup(#[from] SetupError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The configured storage backend could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// No API client was supplied and none can be built.
    #[error("No Bot API client: supply one with `with_api` or enable the `http-client` feature")]
    NoApiClient,

    /// The configuration asks for something this build was compiled without.
    #[error("Feature `{0}` is not enabled")]
    FeatureDisabled(&'static str),

    #[error("Failed to listen for shutdown signals: {0}")]
    Signal(#[source] std::io::Error),

    /// The ingestion task panicked or was aborted.
    #[error("Ingestion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
