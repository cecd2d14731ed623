//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use skiff_core::{ApiError, ApiResult, Params, TelegramApi, UpdateContext, Upload};

use crate::bot::Bot;

type UploadCall = (String, Params, Vec<Upload>);

#[derive(Default)]
struct Recorded {
    calls: Vec<(String, Params)>,
    uploads: Vec<UploadCall>,
    responses: HashMap<String, Value>,
    failures: HashMap<String, (i64, String)>,
}

/// A [`TelegramApi`] that records calls and returns canned results.
#[derive(Clone, Default)]
pub struct RecordingApi {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result returned for `method`; `true` otherwise.
    pub fn respond(&self, method: &str, result: Value) {
        self.inner.lock().responses.insert(method.to_string(), result);
    }

    /// Makes `method` fail with a remote error.
    pub fn fail(&self, method: &str, code: i64, description: &str) {
        self.inner
            .lock()
            .failures
            .insert(method.to_string(), (code, description.to_string()));
    }

    pub fn calls(&self) -> Vec<(String, Params)> {
        self.inner.lock().calls.clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(m, _)| m).collect()
    }

    pub fn last_call(&self) -> Option<(String, Params)> {
        self.inner.lock().calls.last().cloned()
    }

    pub fn uploads(&self) -> Vec<UploadCall> {
        self.inner.lock().uploads.clone()
    }

    fn answer(&self, method: &str, params: &Params) -> ApiResult<Value> {
        let inner = self.inner.lock();
        if let Some((code, description)) = inner.failures.get(method) {
            return Err(ApiError::Remote {
                method: method.to_string(),
                code: *code,
                description: description.clone(),
                params: params.clone(),
            });
        }
        Ok(inner.responses.get(method).cloned().unwrap_or(json!(true)))
    }
}

#[async_trait]
impl TelegramApi for RecordingApi {
    async fn call(&self, method: &str, params: Params) -> ApiResult<Value> {
        let result = self.answer(method, &params);
        self.inner.lock().calls.push((method.to_string(), params));
        result
    }

    async fn upload(&self, method: &str, params: Params, files: Vec<Upload>) -> ApiResult<Value> {
        let result = self.answer(method, &params);
        self.inner
            .lock()
            .uploads
            .push((method.to_string(), params, files));
        result
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("https://files.test/{file_path}")
    }

    async fn download(&self, _url: &str, dest: &Path) -> ApiResult<u64> {
        tokio::fs::write(dest, b"data")
            .await
            .map_err(|e| ApiError::File(e.to_string()))?;
        Ok(4)
    }
}

/// A facade over `update` backed by `api`.
pub fn bot_for(api: &RecordingApi, update: Value) -> Bot {
    Bot::new(Arc::new(api.clone()), UpdateContext::new(update))
}
