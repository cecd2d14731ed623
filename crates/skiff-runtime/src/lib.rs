//! skiff runtime: configuration, logging and update ingestion.
//!
//! This crate provides:
//! - Layered configuration ([`ConfigLoader`], [`SkiffConfig`]) on figment
//! - Logging setup ([`LoggingBuilder`]) on tracing-subscriber
//! - [`SkiffRuntime`], which freezes a router into a dispatcher and runs it
//!   behind long polling or a webhook until shutdown
//!
//! ```ignore
//! use skiff_framework::Router;
//! use skiff_runtime::SkiffRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads skiff.toml and SKIFF_* variables, installs logging
//!     let runtime = SkiffRuntime::builder().build()?;
//!
//!     let mut router = Router::new();
//!     router.on_start().text("Hello!");
//!
//!     let dispatcher = runtime.dispatcher(router).await?;
//!     runtime.run_polling(dispatcher).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `toml-config` *(default)* / `yaml-config`: configuration file formats
//! - `json-log`: JSON log lines
//! - `http-client`: build the Bot API client from configuration
//! - `webhook`: [`SkiffRuntime::run_webhook`]
//! - `redis`: the redis storage backend

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, SkiffConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RuntimeBuilder, SHUTDOWN_GRACE, SkiffRuntime, update_sink};

// Re-export tracing for use by bot crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for bot code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
