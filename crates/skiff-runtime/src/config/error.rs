//! Errors raised while reading and checking a [`SkiffConfig`](super::SkiffConfig).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A file passed to [`ConfigLoader::file`](super::ConfigLoader::file) does not exist.
    #[error("Config file {} does not exist", .0.display())]
    NotFound(PathBuf),

    /// No enabled format feature reads files with this extension.
    #[error("No enabled config format reads `.{0}` files")]
    UnsupportedFormat(String),

    /// The merged sources do not fit the schema.
    #[error("Could not read configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("`{key}` must be set")]
    Missing { key: &'static str },

    /// A key holds a value outside its accepted shape or range.
    #[error("`{key}` is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    pub fn missing(key: &'static str) -> Self {
        Self::Missing { key }
    }

    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }

    /// The dotted key the error is about, for validation errors.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::Missing { key } | Self::Invalid { key, .. } => Some(*key),
            _ => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
