//! The outbound Bot API capability.
//!
//! Everything above the transport talks to Telegram through [`TelegramApi`]:
//! routers and message builders only ever produce a method name and a
//! parameter map. The reqwest implementation lives in `skiff-transport`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Parameters of a Bot API call.
pub type Params = serde_json::Map<String, Value>;

/// A type-erased API client shared by every update task.
pub type BoxedApi = Arc<dyn TelegramApi>;

/// Receives raw updates from an ingestion loop (long polling or webhook).
///
/// Implementations must not block: the runtime's sink spawns a task per update.
pub type UpdateSink = Arc<dyn Fn(Value) + Send + Sync>;

/// Converts a JSON object into [`Params`]; any other value yields an empty map.
pub fn to_params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// A local file attached to a multipart request under `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Multipart field name (e.g. `photo`, or `file0` for `attach://file0`).
    pub field: String,
    /// Path on the local filesystem.
    pub path: PathBuf,
}

impl Upload {
    /// Creates an upload for `field`.
    pub fn new(field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            field: field.into(),
            path: path.into(),
        }
    }
}

/// How a media value given by the user should be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFile {
    /// An `http(s)://` URL Telegram fetches itself.
    Url(String),
    /// A file already stored on Telegram servers.
    FileId(String),
    /// A file on the local disk, sent as multipart.
    Local(PathBuf),
}

impl InputFile {
    /// Classifies `input`: URLs first, then existing local paths, otherwise a file id.
    pub fn detect(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            Self::Url(input.to_string())
        } else if Path::new(input).is_file() {
            Self::Local(PathBuf::from(input))
        } else {
            Self::FileId(input.to_string())
        }
    }

    /// Returns the value placed in request parameters, `None` for local files.
    pub fn as_remote(&self) -> Option<&str> {
        match self {
            Self::Url(s) | Self::FileId(s) => Some(s),
            Self::Local(_) => None,
        }
    }
}

/// Generic "call remote method with parameters" capability.
///
/// Modeled as a single entry point rather than one method per endpoint: the
/// framework builds parameter maps and this trait moves them over the wire.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    /// Calls `method` and returns the `result` field of a successful response.
    async fn call(&self, method: &str, params: Params) -> ApiResult<Value>;

    /// Calls `method` with a per-call timeout overriding the client default.
    ///
    /// Used by long polling, whose request deliberately outlives the default timeout.
    async fn call_with_timeout(
        &self,
        method: &str,
        params: Params,
        timeout: Duration,
    ) -> ApiResult<Value> {
        let _ = timeout;
        self.call(method, params).await
    }

    /// Calls `method` as a multipart request carrying local files.
    async fn upload(&self, method: &str, params: Params, files: Vec<Upload>) -> ApiResult<Value> {
        let _ = (params, files);
        Err(ApiError::File(format!(
            "this client cannot upload local files (method '{method}')"
        )))
    }

    /// Returns the download URL for a `file_path` obtained from `getFile`.
    fn file_url(&self, file_path: &str) -> String;

    /// Downloads `url` into `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> ApiResult<u64> {
        let _ = dest;
        Err(ApiError::File(format!(
            "this client cannot download files ({url})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_input_file() {
        assert_eq!(
            InputFile::detect("https://example.com/a.png"),
            InputFile::Url("https://example.com/a.png".into())
        );
        assert_eq!(
            InputFile::detect("AgACAgIAAxkBAAIB"),
            InputFile::FileId("AgACAgIAAxkBAAIB".into())
        );
        assert!(InputFile::detect("AgACAgIAAxkBAAIB").as_remote().is_some());
    }

    #[test]
    fn test_to_params_ignores_non_objects() {
        assert!(to_params(json!([1, 2])).is_empty());
        assert_eq!(to_params(json!({"a": 1})).len(), 1);
    }
}
