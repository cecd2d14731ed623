//! Files stored on Telegram servers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use skiff_core::{ApiError, BoxedApi, Params};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{BotError, BotResult};

/// Largest file the Bot API lets bots download.
pub const MAX_DOWNLOAD_SIZE: u64 = 20 * 1024 * 1024;

/// Media fields searched, in order, when no type is requested.
const FILE_FIELDS: &[&str] = &[
    "photo",
    "document",
    "video",
    "audio",
    "voice",
    "sticker",
    "video_note",
];

/// Unit of [`FileRef::size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeUnit {
    #[default]
    Bytes,
    Kilobytes,
    Megabytes,
}

impl SizeUnit {
    fn divisor(self) -> f64 {
        match self {
            Self::Bytes => 1.0,
            Self::Kilobytes => 1024.0,
            Self::Megabytes => 1_048_576.0,
        }
    }
}

/// The `getFile` response.
#[derive(Debug, Clone, Deserialize)]
pub struct FileInfo {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_path: Option<String>,
}

/// A handle to a file; `getFile` is called at most once per handle.
#[derive(Clone)]
pub struct FileRef {
    file_id: String,
    api: BoxedApi,
    info: Arc<OnceCell<FileInfo>>,
}

impl FileRef {
    pub fn new(file_id: impl Into<String>, api: BoxedApi) -> Self {
        Self {
            file_id: file_id.into(),
            api,
            info: Arc::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.file_id
    }

    /// File metadata, fetched on first use.
    pub async fn info(&self) -> BotResult<&FileInfo> {
        self.info
            .get_or_try_init(|| async {
                let mut params = Params::new();
                params.insert("file_id".into(), json!(self.file_id));
                let result = self.api.call("getFile", params).await?;
                serde_json::from_value::<FileInfo>(result)
                    .map_err(|e| BotError::Api(ApiError::from(e)))
            })
            .await
    }

    /// File size in `unit`, rounded to five decimals; 0 when unknown.
    pub async fn size(&self, unit: SizeUnit) -> BotResult<f64> {
        let bytes = self.info().await?.file_size.unwrap_or(0) as f64;
        Ok((bytes / unit.divisor() * 100_000.0).round() / 100_000.0)
    }

    /// Download URL of the file.
    pub async fn url(&self) -> BotResult<String> {
        let path = self
            .info()
            .await?
            .file_path
            .as_deref()
            .ok_or(BotError::Missing("file path"))?;
        Ok(self.api.file_url(path))
    }

    /// Downloads the file to `dest` and returns the written path.
    ///
    /// When `dest` is a directory (or ends with a separator) the server-side
    /// file name is appended. Missing parent directories are created.
    pub async fn save(&self, dest: impl AsRef<Path>) -> BotResult<PathBuf> {
        let size = self.info().await?.file_size.unwrap_or(0);
        if size >= MAX_DOWNLOAD_SIZE {
            return Err(BotError::FileTooLarge {
                size,
                limit: MAX_DOWNLOAD_SIZE,
            });
        }

        let url = self.url().await?;
        let dest = dest.as_ref();
        let is_dir = dest.as_os_str().to_string_lossy().ends_with(['/', '\\'])
            || tokio::fs::metadata(dest).await.is_ok_and(|m| m.is_dir());
        let target = if is_dir {
            let name = url.rsplit('/').next().unwrap_or(self.file_id.as_str());
            dest.join(name)
        } else {
            dest.to_path_buf()
        };

        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BotError::Api(ApiError::File(e.to_string())))?;
        }

        let written = self.api.download(&url, &target).await?;
        debug!(file_id = %self.file_id, bytes = written, path = %target.display(), "File saved");
        Ok(target)
    }
}

impl fmt::Debug for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRef")
            .field("file_id", &self.file_id)
            .finish()
    }
}

/// Extracts a file id from an update or API result.
///
/// With `kind` the given media field is read; otherwise the first present of
/// photo, document, video, audio, voice, sticker, video note. For photos the
/// largest size (last element) wins.
pub fn file_id_from(value: &Value, kind: Option<&str>) -> Option<String> {
    let message = value.get("result").or_else(|| value.get("message"))?;

    let field_id = |field: &str| -> Option<String> {
        let media = message.get(field)?;
        let media = if field == "photo" {
            media.as_array()?.last()?
        } else {
            media
        };
        media.get("file_id")?.as_str().map(str::to_string)
    };

    match kind {
        Some(field) => field_id(field),
        None => FILE_FIELDS
            .iter()
            .find(|field| message.get(**field).is_some())
            .and_then(|field| field_id(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingApi;

    #[test]
    fn test_file_id_from_media_kinds() {
        let photo = json!({"message": {"photo": [
            {"file_id": "small_id", "file_size": 100},
            {"file_id": "medium_id", "file_size": 500},
            {"file_id": "large_id", "file_size": 1000}
        ]}});
        assert_eq!(file_id_from(&photo, None).as_deref(), Some("large_id"));

        let doc = json!({"message": {"document": {"file_id": "doc_123"}}});
        assert_eq!(file_id_from(&doc, None).as_deref(), Some("doc_123"));

        let voice = json!({"result": {"voice": {"file_id": "voice_777"}}});
        assert_eq!(file_id_from(&voice, None).as_deref(), Some("voice_777"));

        let mixed = json!({"message": {
            "photo": [{"file_id": "p1"}],
            "video": {"file_id": "v1"}
        }});
        assert_eq!(file_id_from(&mixed, Some("video")).as_deref(), Some("v1"));
        assert_eq!(file_id_from(&json!({}), None), None);
    }

    #[tokio::test]
    async fn test_size_conversion_fetches_once() {
        let api = RecordingApi::new();
        api.respond(
            "getFile",
            json!({"file_id": "test_file", "file_size": 1_048_576, "file_path": "docs/a.pdf"}),
        );
        let file = FileRef::new("test_file", Arc::new(api.clone()));

        assert_eq!(file.size(SizeUnit::Bytes).await.unwrap(), 1_048_576.0);
        assert_eq!(file.size(SizeUnit::Kilobytes).await.unwrap(), 1024.0);
        assert_eq!(file.size(SizeUnit::Megabytes).await.unwrap(), 1.0);
        assert_eq!(file.url().await.unwrap(), "https://files.test/docs/a.pdf");

        assert_eq!(api.calls().len(), 1);
        assert_eq!(api.calls()[0].1["file_id"], "test_file");
    }

    #[tokio::test]
    async fn test_save_rejects_large_files() {
        let api = RecordingApi::new();
        api.respond(
            "getFile",
            json!({"file_id": "big", "file_size": MAX_DOWNLOAD_SIZE, "file_path": "v.mp4"}),
        );
        let file = FileRef::new("big", Arc::new(api));

        let err = file.save("/tmp").await.unwrap_err();
        assert!(matches!(err, BotError::FileTooLarge { .. }));
    }
}
