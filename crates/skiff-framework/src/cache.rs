//! File-backed [`MetadataCache`].

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use skiff_core::{MetadataCache, StorageResult};
use tracing::{trace, warn};

/// Default directory of [`FileMetadataCache`].
pub const DEFAULT_CACHE_DIR: &str = "storage/cache";

/// Default entry lifetime for callers without a TTL of their own.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Serialize, Deserialize)]
struct Entry {
    /// Unix seconds.
    expires: u64,
    data: Value,
}

/// One JSON file per key, named by the key's SHA-256.
///
/// Expired or unreadable entries are removed on read.
#[derive(Debug, Clone)]
pub struct FileMetadataCache {
    dir: PathBuf,
}

impl Default for FileMetadataCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

impl FileMetadataCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        let name = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{name}.json"))
    }

    /// Removes the entry for `key`.
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        match tokio::fs::remove_file(self.path(key)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[async_trait]
impl MetadataCache for FileMetadataCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let content = tokio::fs::read(self.path(key)).await.ok()?;

        match serde_json::from_slice::<Entry>(&content) {
            Ok(entry) if entry.expires >= now() => Some(entry.data),
            Ok(_) => {
                trace!(key, "Cache entry expired");
                let _ = self.delete(key).await;
                None
            }
            Err(e) => {
                warn!(key, error = %e, "Dropping unreadable cache entry");
                let _ = self.delete(key).await;
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let entry = Entry {
            expires: now() + ttl.as_secs(),
            data: value,
        };
        tokio::fs::write(self.path(key), serde_json::to_vec(&entry)?).await?;
        Ok(())
    }
}
