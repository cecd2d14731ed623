//! Runtime orchestration.
//!
//! [`SkiffRuntime`] owns the loaded configuration. It turns a [`Router`] into
//! a [`Dispatcher`] with the configured storage, metadata cache and parse
//! mode, then feeds it updates from long polling or a webhook until a
//! shutdown signal arrives.
//!
//! Every update is dispatched on its own task; a slow handler never delays
//! ingestion. On shutdown, ingestion stops first and in-flight updates get
//! [`SHUTDOWN_GRACE`] to finish.
//!
//! ```rust,ignore
//! use skiff_runtime::SkiffRuntime;
//!
//! let runtime = SkiffRuntime::builder().profile("production").build()?;
//! let dispatcher = runtime.dispatcher(router).await?;
//! runtime.run_polling(dispatcher).await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use skiff_core::{BoxedApi, BoxedStorage, TransportError, TransportResult, UpdateSink};
use skiff_framework::{Dispatcher, FileMetadataCache, FileStorage, MemoryStorage, Router};
use skiff_transport::LongPoller;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, SkiffConfig, StorageBackend, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// How long in-flight updates may run after ingestion stops.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Configuration plus the Bot API client, ready to run a dispatcher.
pub struct SkiffRuntime {
    config: SkiffConfig,
    api: Option<BoxedApi>,
}

impl SkiffRuntime {
    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration and installs
    /// the configured logging.
    pub fn from_config(config: SkiffConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            storage = ?config.storage.backend,
            "Runtime initialized from configuration"
        );

        Self { config, api: None }
    }

    pub fn config(&self) -> &SkiffConfig {
        &self.config
    }

    /// Uses `api` instead of building an HTTP client from the configuration.
    pub fn with_api(mut self, api: BoxedApi) -> Self {
        self.api = Some(api);
        self
    }

    /// The supplied client, or a new HTTP client for the configured token.
    pub fn api(&self) -> RuntimeResult<BoxedApi> {
        match &self.api {
            Some(api) => Ok(Arc::clone(api)),
            None => self.http_client(),
        }
    }

    #[cfg(feature = "http-client")]
    fn http_client(&self) -> RuntimeResult<BoxedApi> {
        let client = skiff_transport::HttpApiClient::builder(self.config.bot.token.clone())
            .base_url(self.config.bot.api_url.clone())
            .timeout(self.config.network.timeout())
            .connect_timeout(self.config.network.connect_timeout())
            .build()?;
        Ok(Arc::new(client))
    }

    #[cfg(not(feature = "http-client"))]
    fn http_client(&self) -> RuntimeResult<BoxedApi> {
        Err(RuntimeError::NoApiClient)
    }

    // =========================================================================
    // Dispatcher
    // =========================================================================

    /// Freezes `router`, filling in what it does not set itself: state
    /// storage, the persistent metadata cache (when enabled) and the default
    /// parse mode.
    pub async fn dispatcher(&self, mut router: Router) -> RuntimeResult<Dispatcher> {
        if !router.has_storage() {
            router.storage(self.storage().await?);
        }
        if self.config.cache.enabled && !router.has_metadata_cache() {
            debug!(dir = %self.config.cache.dir.display(), "Using file metadata cache");
            router.metadata_cache(Arc::new(FileMetadataCache::new(&self.config.cache.dir)));
        }
        if router.configured_parse_mode().is_none() {
            router.parse_mode(self.config.bot.parse_mode);
        }
        Ok(router.into_dispatcher()?)
    }

    /// Opens the configured storage backend.
    pub async fn storage(&self) -> RuntimeResult<BoxedStorage> {
        let storage = &self.config.storage;
        let backend: BoxedStorage = match storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
            StorageBackend::File => Arc::new(FileStorage::new(&storage.dir)),
            #[cfg(feature = "redis")]
            StorageBackend::Redis => {
                let url = storage
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| crate::config::ConfigError::missing("storage.redis_url"))?;
                Arc::new(skiff_framework::RedisStorage::connect(url, storage.prefix.clone()).await?)
            }
            #[cfg(not(feature = "redis"))]
            StorageBackend::Redis => return Err(RuntimeError::FeatureDisabled("redis")),
        };
        debug!(backend = ?storage.backend, "State storage ready");
        Ok(backend)
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Long polls until Ctrl+C or SIGTERM.
    pub async fn run_polling(&self, dispatcher: Dispatcher) -> RuntimeResult<()> {
        let signal = shutdown_signal()?;
        self.run_polling_until(dispatcher, signal).await
    }

    /// Long polls until `shutdown` completes.
    pub async fn run_polling_until<F>(&self, dispatcher: Dispatcher, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let api = self.api()?;
        let polling = &self.config.polling;

        let mut poller = LongPoller::new(Arc::clone(&api))
            .timeout(polling.timeout())
            .backoff(polling.backoff())
            .drop_pending_updates(polling.drop_pending_updates);
        if let Some(limit) = polling.limit {
            poller = poller.limit(limit);
        }
        if !polling.allowed_updates.is_empty() {
            poller = poller.allowed_updates(polling.allowed_updates.iter().cloned());
        }

        let tracker = TaskTracker::new();
        let sink = update_sink(api, dispatcher, tracker.clone());
        let token = CancellationToken::new();

        info!(timeout_secs = polling.timeout_secs, "Long polling started");
        let ingest = tokio::spawn({
            let token = token.clone();
            async move {
                poller.run(sink, token).await;
                Ok::<_, TransportError>(())
            }
        });

        supervise(ingest, token, tracker, shutdown).await
    }

    /// Serves the webhook until Ctrl+C or SIGTERM.
    #[cfg(feature = "webhook")]
    pub async fn run_webhook(&self, dispatcher: Dispatcher) -> RuntimeResult<()> {
        let signal = shutdown_signal()?;
        self.run_webhook_until(dispatcher, signal).await
    }

    /// Serves the webhook until `shutdown` completes.
    ///
    /// Registering the URL with `setWebhook` is left to the caller.
    #[cfg(feature = "webhook")]
    pub async fn run_webhook_until<F>(&self, dispatcher: Dispatcher, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let api = self.api()?;
        let webhook = &self.config.webhook;

        let mut server = skiff_transport::WebhookServer::new(webhook.addr(), webhook.path.clone());
        if let Some(secret) = &webhook.secret_token {
            server = server.secret_token(secret.clone());
        }

        let tracker = TaskTracker::new();
        let sink = update_sink(api, dispatcher, tracker.clone());
        let token = CancellationToken::new();

        info!(addr = %webhook.addr(), path = %webhook.path, "Webhook server starting");
        let ingest = tokio::spawn(server.run(sink, token.clone()));

        supervise(ingest, token, tracker, shutdown).await
    }
}

// =============================================================================
// Plumbing
// =============================================================================

/// A sink that dispatches each update on its own task.
pub fn update_sink(api: BoxedApi, dispatcher: Dispatcher, tracker: TaskTracker) -> UpdateSink {
    Arc::new(move |update: Value| {
        let bot = dispatcher.bot(Arc::clone(&api), update);
        let dispatcher = dispatcher.clone();
        tracker.spawn(async move { dispatcher.process(bot).await });
    })
}

/// Waits for `shutdown` or the end of ingestion, then drains in-flight
/// updates.
async fn supervise<F>(
    mut ingest: JoinHandle<TransportResult<()>>,
    token: CancellationToken,
    tracker: TaskTracker,
    shutdown: F,
) -> RuntimeResult<()>
where
    F: Future<Output = ()>,
{
    let outcome = tokio::select! {
        joined = &mut ingest => {
            if let Ok(Err(e)) = &joined {
                error!(error = %e, "Ingestion stopped");
            }
            joined
        }
        () = shutdown => {
            token.cancel();
            ingest.await
        }
    };

    tracker.close();
    if tokio::time::timeout(SHUTDOWN_GRACE, tracker.wait()).await.is_err() {
        warn!(
            pending = tracker.len(),
            "Shutdown grace period elapsed with updates still in flight"
        );
    }
    info!("Runtime stopped");

    outcome??;
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
fn shutdown_signal() -> RuntimeResult<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .map_err(RuntimeError::Signal)?;

    Ok(async move {
        #[cfg(unix)]
        tokio::select! {
            result = signal::ctrl_c() => log_ctrl_c(result),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        }

        #[cfg(not(unix))]
        log_ctrl_c(signal::ctrl_c().await);
    })
}

fn log_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads and validates the configuration, then creates a [`SkiffRuntime`].
///
/// ```rust,ignore
/// let runtime = SkiffRuntime::builder()
///     .config_file("deploy/skiff.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Searches the current directory by default.
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    pub fn search_path(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.loader = self.loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    pub fn merge(mut self, config: SkiffConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    pub fn build(self) -> RuntimeResult<SkiffRuntime> {
        let config = self.loader.load()?;
        validate_config(&config)?;
        Ok(SkiffRuntime::from_config(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
