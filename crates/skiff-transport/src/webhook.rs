//! Webhook ingestion.
//!
//! [`WebhookServer`] exposes one POST route. Each request body is one
//! update; it is handed to the [`UpdateSink`] and answered with 200 right
//! away, before the update is processed.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use serde_json::Value;
use skiff_core::{TransportError, TransportResult, UpdateSink};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Header carrying the secret set with `setWebhook`.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Shared state for the webhook route.
struct WebhookState {
    sink: UpdateSink,
    secret: Option<String>,
}

/// HTTP endpoint Telegram posts updates to.
#[derive(Debug, Clone)]
pub struct WebhookServer {
    addr: String,
    path: String,
    secret: Option<String>,
}

impl WebhookServer {
    /// Serves `path` on `addr` (e.g. `0.0.0.0:8443`).
    pub fn new(addr: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Self {
            addr: addr.into(),
            path,
            secret: None,
        }
    }

    /// Rejects requests whose secret header differs.
    pub fn secret_token(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// The axum router, for mounting into an existing server.
    pub fn router(&self, sink: UpdateSink) -> Router {
        let state = Arc::new(WebhookState {
            sink,
            secret: self.secret.clone(),
        });
        Router::new()
            .route(&self.path, post(receive))
            .with_state(state)
    }

    /// Serves until `shutdown` is cancelled.
    pub async fn run(self, sink: UpdateSink, shutdown: CancellationToken) -> TransportResult<()> {
        let router = self.router(sink);
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| TransportError::Connect {
                target: self.addr.clone(),
                reason: e.to_string(),
            })?;
        let actual_addr = listener.local_addr()?;

        info!(addr = %actual_addr, path = %self.path, "Webhook server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Webhook server stopped");
        Ok(())
    }
}

/// Webhook POST handler.
async fn receive(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = &state.secret {
        let given = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if given != Some(secret.as_str()) {
            warn!("Webhook request with a wrong secret token");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let update: Value = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            debug!(error = %e, len = body.len(), "Webhook body is not JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    trace!(update_id = ?update.get("update_id"), "Webhook update received");
    (state.sink)(update);
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use parking_lot::Mutex;
    use serde_json::json;
    use tower::ServiceExt;

    fn collecting_sink() -> (UpdateSink, Arc<Mutex<Vec<Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&received);
        let sink: UpdateSink = Arc::new(move |update| store.lock().push(update));
        (sink, received)
    }

    fn post_to(path: &str, body: &str, secret: Option<&str>) -> Request<Body> {
        let mut request = Request::builder().method("POST").uri(path);
        if let Some(secret) = secret {
            request = request.header(SECRET_HEADER, secret);
        }
        request.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_accepts_update() {
        let (sink, received) = collecting_sink();
        let router = WebhookServer::new("127.0.0.1:0", "hook").router(sink);

        let response = router
            .oneshot(post_to("/hook", r#"{"update_id": 7}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(received.lock().as_slice(), [json!({"update_id": 7})]);
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let (sink, received) = collecting_sink();
        let router = WebhookServer::new("127.0.0.1:0", "/hook").router(sink);

        let response = router.oneshot(post_to("/hook", "not json", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(received.lock().is_empty());
    }

    #[tokio::test]
    async fn test_secret_token() {
        let (sink, received) = collecting_sink();
        let server = WebhookServer::new("127.0.0.1:0", "/hook").secret_token("s3cret");

        let rejected = server
            .router(sink.clone())
            .oneshot(post_to("/hook", "{}", Some("wrong")))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);

        let missing = server
            .router(sink.clone())
            .oneshot(post_to("/hook", "{}", None))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let accepted = server
            .router(sink)
            .oneshot(post_to("/hook", "{}", Some("s3cret")))
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::OK);
        assert_eq!(received.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (sink, _) = collecting_sink();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        WebhookServer::new("127.0.0.1:0", "/hook")
            .run(sink, shutdown)
            .await
            .unwrap();
    }
}
