//! # skiff transport
//!
//! Moves Bot API traffic over the network.
//!
//! ## Features
//!
//! - `http-client`: [`HttpApiClient`], the reqwest implementation of
//!   [`TelegramApi`](skiff_core::TelegramApi)
//! - `webhook`: [`WebhookServer`], an axum endpoint receiving updates
//! - `full`: both
//!
//! [`LongPoller`] is always available; it only needs some `TelegramApi`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  skiff-runtime       │  (spawns one dispatch task per update)
//! ├──────────────────────┤
//! │  UpdateSink          │  <- LongPoller / WebhookServer push here
//! ├──────────────────────┤
//! │  skiff-transport     │  <- This crate
//! ├──────────────────────┤
//! │  Network (HTTPS)     │
//! └──────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use skiff_transport::{HttpApiClient, LongPoller};
//! use tokio_util::sync::CancellationToken;
//!
//! let api = Arc::new(HttpApiClient::new(token)?);
//! let sink: UpdateSink = Arc::new(|update| println!("{update}"));
//!
//! LongPoller::new(api)
//!     .drop_pending_updates(true)
//!     .run(sink, CancellationToken::new())
//!     .await;
//! ```

pub mod polling;

#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "webhook")]
pub mod webhook;

pub use polling::LongPoller;

#[cfg(feature = "http-client")]
pub use http::{DEFAULT_API_URL, HttpApiClient, HttpApiClientBuilder};

#[cfg(feature = "webhook")]
pub use webhook::{SECRET_HEADER, WebhookServer};
