//! reqwest implementation of [`TelegramApi`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use skiff_core::{ApiError, ApiResult, Params, TelegramApi, TransportError, TransportResult, Upload};
use tracing::{debug, trace};

/// Public Bot API server.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bot API client over HTTPS.
///
/// Calls go to `{base}/bot{token}/{method}` as JSON, or as multipart when
/// local files are attached. A call succeeds only on HTTP 200 with
/// `"ok": true`; anything else is an [`ApiError::Remote`].
#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpApiClient {
    /// Creates a client for the public Bot API with default timeouts.
    pub fn new(token: impl Into<String>) -> TransportResult<Self> {
        Self::builder(token).build()
    }

    pub fn builder(token: impl Into<String>) -> HttpApiClientBuilder {
        HttpApiClientBuilder {
            token: token.into(),
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn send(&self, method: &str, params: Params, request: RequestBuilder) -> ApiResult<Value> {
        trace!(method, "Sending Bot API request");

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(method, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(method, e))?;

        let envelope: Value = serde_json::from_str(&body).map_err(|_| {
            TransportError::Malformed(format!(
                "'{method}' answered HTTP {} with a non-JSON body",
                status.as_u16()
            ))
        })?;

        if status == StatusCode::OK && envelope["ok"].as_bool() == Some(true) {
            return Ok(envelope.get("result").cloned().unwrap_or(Value::Null));
        }

        let code = envelope["error_code"]
            .as_i64()
            .unwrap_or_else(|| i64::from(status.as_u16()));
        let description = envelope["description"]
            .as_str()
            .unwrap_or("no description")
            .to_string();
        debug!(method, code, description = %description, "Bot API request declined");

        Err(ApiError::Remote {
            method: method.to_string(),
            code,
            description,
            params,
        })
    }

    /// Maps a reqwest failure without leaking the token-bearing URL.
    fn transport_error(&self, method: &str, err: reqwest::Error) -> ApiError {
        let err = err.without_url();
        let reason = err.to_string();
        let method = method.to_string();
        let err = if err.is_timeout() {
            TransportError::Timeout { method }
        } else if err.is_connect() {
            TransportError::Connect {
                target: self.base_url.clone(),
                reason,
            }
        } else {
            TransportError::Request { method, reason }
        };
        ApiError::Transport(err)
    }
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TelegramApi for HttpApiClient {
    async fn call(&self, method: &str, params: Params) -> ApiResult<Value> {
        let request = self.client.post(self.method_url(method)).json(&params);
        self.send(method, params, request).await
    }

    async fn call_with_timeout(
        &self,
        method: &str,
        params: Params,
        timeout: Duration,
    ) -> ApiResult<Value> {
        let request = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(&params);
        self.send(method, params, request).await
    }

    async fn upload(&self, method: &str, params: Params, files: Vec<Upload>) -> ApiResult<Value> {
        let mut form = Form::new();
        for (key, value) in &params {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(key.clone(), text);
        }

        for upload in files {
            let bytes = tokio::fs::read(&upload.path).await.map_err(|e| {
                ApiError::File(format!("cannot read {}: {e}", upload.path.display()))
            })?;
            let file_name = upload
                .path
                .file_name()
                .map_or_else(|| upload.field.clone(), |name| name.to_string_lossy().into_owned());
            form = form.part(upload.field, Part::bytes(bytes).file_name(file_name));
        }

        let request = self.client.post(self.method_url(method)).multipart(form);
        self.send(method, params, request).await
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token, file_path)
    }

    async fn download(&self, url: &str, dest: &Path) -> ApiResult<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error("download", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Malformed(format!(
                "file download answered HTTP {}",
                status.as_u16()
            ))
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error("download", e))?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| ApiError::File(format!("cannot write {}: {e}", dest.display())))?;

        Ok(bytes.len() as u64)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`HttpApiClient`].
#[derive(Debug, Clone)]
pub struct HttpApiClientBuilder {
    token: String,
    base_url: String,
    timeout: Duration,
    connect_timeout: Duration,
}

impl HttpApiClientBuilder {
    /// Bot API server, e.g. a self-hosted one.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Total time allowed for a regular call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn build(self) -> TransportResult<HttpApiClient> {
        if self.token.is_empty() {
            return Err(TransportError::Setup("bot token is empty".into()));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        Ok(HttpApiClient {
            client,
            base_url: self.base_url,
            token: self.token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::Server) -> HttpApiClient {
        HttpApiClient::builder("TOKEN")
            .base_url(server.url())
            .build()
            .unwrap()
    }

    fn params(value: Value) -> Params {
        skiff_core::to_params(value)
    }

    #[tokio::test]
    async fn test_call_returns_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botTOKEN/sendMessage")
            .match_body(Matcher::PartialJson(json!({"chat_id": 1, "text": "hi"})))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{"message_id":5}}"#)
            .create_async()
            .await;

        let result = client(&server)
            .call("sendMessage", params(json!({"chat_id": 1, "text": "hi"})))
            .await
            .unwrap();

        assert_eq!(result, json!({"message_id": 5}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_declined_call_carries_params() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/botTOKEN/sendMessage")
            .with_status(400)
            .with_body(r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#)
            .create_async()
            .await;

        let err = client(&server)
            .call("sendMessage", params(json!({"chat_id": 404})))
            .await
            .unwrap_err();

        match err {
            ApiError::Remote {
                method,
                code,
                description,
                params,
            } => {
                assert_eq!(method, "sendMessage");
                assert_eq!(code, 400);
                assert_eq!(description, "Bad Request: chat not found");
                assert_eq!(params["chat_id"], 404);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_ok_false_with_200_is_declined() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/botTOKEN/getMe")
            .with_status(200)
            .with_body(r#"{"ok":false,"description":"odd"}"#)
            .create_async()
            .await;

        let err = client(&server).call("getMe", Params::new()).await.unwrap_err();
        assert_eq!(err.code(), Some(200));
    }

    #[tokio::test]
    async fn test_non_json_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/botTOKEN/getMe")
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let err = client(&server).call("getMe", Params::new()).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Transport(TransportError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_sends_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.jpg");
        std::fs::write(&path, b"fake-image-bytes").unwrap();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botTOKEN/sendPhoto")
            .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("fake-image-bytes".into()),
                Matcher::Regex(r#"filename="cat.jpg""#.into()),
            ]))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":true}"#)
            .create_async()
            .await;

        client(&server)
            .upload(
                "sendPhoto",
                params(json!({"chat_id": 1})),
                vec![Upload::new("photo", &path)],
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/file/botTOKEN/photos/a.jpg")
            .with_status(200)
            .with_body("abc")
            .create_async()
            .await;

        let api = client(&server);
        let url = api.file_url("photos/a.jpg");
        assert_eq!(url, format!("{}/file/botTOKEN/photos/a.jpg", server.url()));

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.jpg");
        assert_eq!(api.download(&url, &dest).await.unwrap(), 3);
        assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(
            HttpApiClient::new(""),
            Err(TransportError::Setup(_))
        ));
    }
}
