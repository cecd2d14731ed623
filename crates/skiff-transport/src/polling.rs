//! Long polling ingestion.
//!
//! [`LongPoller`] calls `getUpdates` in a loop and hands each update to an
//! [`UpdateSink`] without waiting for it to be processed. The offset moves
//! past every received update immediately, so a slow handler never causes
//! redelivery.

use std::time::Duration;

use serde_json::{Value, json};
use skiff_core::{ApiResult, BoxedApi, Params, TransportError, UpdateSink};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Server-side wait of one `getUpdates` call.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(20);

/// Pause after a failed `getUpdates` call.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// Extra client-side time on top of the server-side wait.
const CLIENT_GRACE: Duration = Duration::from_secs(15);

/// `getUpdates` loop.
pub struct LongPoller {
    api: BoxedApi,
    timeout: Duration,
    backoff: Duration,
    limit: Option<u32>,
    allowed_updates: Vec<String>,
    drop_pending: bool,
}

impl LongPoller {
    pub fn new(api: BoxedApi) -> Self {
        Self {
            api,
            timeout: DEFAULT_POLL_TIMEOUT,
            backoff: DEFAULT_BACKOFF,
            limit: None,
            allowed_updates: Vec::new(),
            drop_pending: false,
        }
    }

    /// Server-side wait per call. The HTTP request itself gets 15 s more.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Maximum updates per call (1-100).
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Update types to receive; empty means all.
    pub fn allowed_updates<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_updates = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Skip updates that queued up while the bot was offline.
    pub fn drop_pending_updates(mut self, drop: bool) -> Self {
        self.drop_pending = drop;
        self
    }

    /// Polls until `shutdown` is cancelled.
    pub async fn run(self, sink: UpdateSink, shutdown: CancellationToken) {
        let mut offset = 0;
        if self.drop_pending {
            offset = self.skip_pending().await;
        }

        info!(timeout = ?self.timeout, "Long polling started");

        loop {
            let fetched = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                fetched = self.fetch(offset) => fetched,
            };

            match fetched {
                Ok(updates) => {
                    if !updates.is_empty() {
                        debug!(count = updates.len(), offset, "Received updates");
                    }
                    for update in updates {
                        if let Some(id) = update.get("update_id").and_then(Value::as_i64) {
                            offset = offset.max(id + 1);
                        }
                        sink(update);
                    }
                }
                Err(e) => {
                    if e.is_transport() {
                        warn!(error = %e, backoff = ?self.backoff, "getUpdates failed, retrying");
                    } else {
                        error!(error = %e, backoff = ?self.backoff, "getUpdates declined, retrying");
                    }
                    tokio::select! {
                        biased;
                        () = shutdown.cancelled() => break,
                        () = tokio::time::sleep(self.backoff) => {}
                    }
                }
            }
        }

        info!("Long polling stopped");
    }

    async fn fetch(&self, offset: i64) -> ApiResult<Vec<Value>> {
        let mut params = Params::new();
        params.insert("offset".into(), json!(offset));
        params.insert("timeout".into(), json!(self.timeout.as_secs()));
        if let Some(limit) = self.limit {
            params.insert("limit".into(), json!(limit));
        }
        if !self.allowed_updates.is_empty() {
            params.insert("allowed_updates".into(), json!(self.allowed_updates));
        }

        let result = self
            .api
            .call_with_timeout("getUpdates", params, self.timeout + CLIENT_GRACE)
            .await?;

        match result {
            Value::Array(updates) => Ok(updates),
            Value::Null => Ok(Vec::new()),
            other => Err(TransportError::Malformed(format!(
                "getUpdates returned {other} instead of a list"
            ))
            .into()),
        }
    }

    /// Returns the offset just past the newest pending update. Failures
    /// are ignored and polling starts from 0.
    async fn skip_pending(&self) -> i64 {
        let mut params = Params::new();
        params.insert("offset".into(), json!(-1));
        params.insert("limit".into(), json!(1));

        match self.api.call("getUpdates", params).await {
            Ok(Value::Array(updates)) => {
                let offset = updates
                    .last()
                    .and_then(|u| u.get("update_id"))
                    .and_then(Value::as_i64)
                    .map_or(0, |id| id + 1);
                debug!(offset, "Dropped pending updates");
                offset
            }
            Ok(_) => 0,
            Err(e) => {
                debug!(error = %e, "Could not drop pending updates");
                0
            }
        }
    }
}

impl std::fmt::Debug for LongPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LongPoller")
            .field("timeout", &self.timeout)
            .field("backoff", &self.backoff)
            .field("limit", &self.limit)
            .field("allowed_updates", &self.allowed_updates)
            .field("drop_pending", &self.drop_pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use skiff_core::{ApiError, TelegramApi};

    /// Replays scripted `getUpdates` results, then cancels the poller.
    struct ScriptedApi {
        script: Mutex<VecDeque<ApiResult<Value>>>,
        calls: Mutex<Vec<(Params, Option<Duration>)>>,
        done: CancellationToken,
    }

    impl ScriptedApi {
        fn new(script: Vec<ApiResult<Value>>, done: CancellationToken) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
                done,
            })
        }

        fn next(&self, params: Params, timeout: Option<Duration>) -> ApiResult<Value> {
            self.calls.lock().push((params, timeout));
            let next = self.script.lock().pop_front();
            next.unwrap_or_else(|| {
                self.done.cancel();
                Ok(json!([]))
            })
        }
    }

    #[async_trait]
    impl TelegramApi for ScriptedApi {
        async fn call(&self, _method: &str, params: Params) -> ApiResult<Value> {
            self.next(params, None)
        }

        async fn call_with_timeout(
            &self,
            _method: &str,
            params: Params,
            timeout: Duration,
        ) -> ApiResult<Value> {
            self.next(params, Some(timeout))
        }

        fn file_url(&self, file_path: &str) -> String {
            file_path.to_string()
        }
    }

    fn collecting_sink() -> (UpdateSink, Arc<Mutex<Vec<Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&received);
        let sink: UpdateSink = Arc::new(move |update| store.lock().push(update));
        (sink, received)
    }

    #[tokio::test]
    async fn test_offset_advances_past_each_update() {
        let shutdown = CancellationToken::new();
        let api = ScriptedApi::new(
            vec![
                Ok(json!([{"update_id": 10}, {"update_id": 11}])),
                Ok(json!([{"update_id": 12}])),
            ],
            shutdown.clone(),
        );
        let (sink, received) = collecting_sink();

        LongPoller::new(api.clone()).run(sink, shutdown).await;

        assert_eq!(received.lock().len(), 3);
        let calls = api.calls.lock();
        assert_eq!(calls[0].0["offset"], 0);
        assert_eq!(calls[1].0["offset"], 12);
        assert_eq!(calls[2].0["offset"], 13);
        assert_eq!(calls[0].0["timeout"], 20);
        assert_eq!(calls[0].1, Some(Duration::from_secs(35)));
    }

    #[tokio::test]
    async fn test_errors_back_off_and_continue() {
        let shutdown = CancellationToken::new();
        let api = ScriptedApi::new(
            vec![
                Err(ApiError::Transport(TransportError::Timeout {
                    method: "getUpdates".into(),
                })),
                Ok(json!([{"update_id": 1}])),
            ],
            shutdown.clone(),
        );
        let (sink, received) = collecting_sink();

        LongPoller::new(api.clone())
            .backoff(Duration::from_millis(5))
            .run(sink, shutdown)
            .await;

        assert_eq!(received.lock().len(), 1);
        assert_eq!(api.calls.lock()[1].0["offset"], 0);
    }

    #[tokio::test]
    async fn test_drop_pending_updates() {
        let shutdown = CancellationToken::new();
        let api = ScriptedApi::new(vec![Ok(json!([{"update_id": 99}]))], shutdown.clone());
        let (sink, received) = collecting_sink();

        LongPoller::new(api.clone())
            .drop_pending_updates(true)
            .limit(50)
            .allowed_updates(["message", "callback_query"])
            .run(sink, shutdown)
            .await;

        assert!(received.lock().is_empty());
        let calls = api.calls.lock();
        assert_eq!(calls[0].0["offset"], -1);
        assert_eq!(calls[0].1, None);
        assert_eq!(calls[1].0["offset"], 100);
        assert_eq!(calls[1].0["limit"], 50);
        assert_eq!(calls[1].0["allowed_updates"], json!(["message", "callback_query"]));
    }

    #[tokio::test]
    async fn test_stops_when_cancelled() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let api = ScriptedApi::new(Vec::new(), CancellationToken::new());
        let (sink, _) = collecting_sink();

        LongPoller::new(api.clone()).run(sink, shutdown).await;
        assert!(api.calls.lock().is_empty());
    }
}
