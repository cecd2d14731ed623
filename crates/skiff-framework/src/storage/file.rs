//! JSON file per user.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use skiff_core::{Session, StateStorage, StorageResult};
use tracing::warn;

use super::Record;

/// Default directory of [`FileStorage`].
pub const DEFAULT_SESSION_DIR: &str = "storage/sessions";

/// Stores each user's state and session in `{dir}/{user_id}.json`.
///
/// Unreadable or corrupt files read as empty. The directory is created on
/// the first write. Writes for one user are serialized across clones and
/// land through a rename, so readers never see a half-written file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    locks: Arc<Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>>,
}

impl Default for FileStorage {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_DIR)
    }
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Arc::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, user_id: i64) -> PathBuf {
        self.dir.join(format!("{user_id}.json"))
    }

    async fn load(&self, user_id: i64) -> Record {
        let path = self.path(user_id);
        let Ok(content) = tokio::fs::read(&path).await else {
            return Record::default();
        };
        if content.is_empty() {
            return Record::default();
        }
        serde_json::from_slice(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Ignoring corrupt session file");
            Record::default()
        })
    }

    async fn save(&self, user_id: i64, record: &Record) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let content = serde_json::to_vec_pretty(record)?;
        let target = self.path(user_id);
        let staged = target.with_extension("json.tmp");
        tokio::fs::write(&staged, content).await?;
        tokio::fs::rename(&staged, &target).await?;
        Ok(())
    }

    /// Read-modify-write of one user's record under that user's lock.
    ///
    /// `change` returns whether the record needs saving.
    async fn update(
        &self,
        user_id: i64,
        change: impl FnOnce(&mut Record) -> bool + Send,
    ) -> StorageResult<()> {
        let lock = self.locks.lock().entry(user_id).or_default().clone();
        let _guard = lock.lock().await;

        let mut record = self.load(user_id).await;
        if change(&mut record) {
            self.save(user_id, &record).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StateStorage for FileStorage {
    async fn get_state(&self, user_id: i64) -> StorageResult<Option<String>> {
        Ok(self.load(user_id).await.state)
    }

    async fn set_state(&self, user_id: i64, state: &str) -> StorageResult<()> {
        self.update(user_id, |record| {
            record.state = Some(state.to_string());
            true
        })
        .await
    }

    async fn clear_state(&self, user_id: i64) -> StorageResult<()> {
        self.update(user_id, |record| record.state.take().is_some())
            .await
    }

    async fn get_session(&self, user_id: i64) -> StorageResult<Session> {
        Ok(self.load(user_id).await.session.unwrap_or_default())
    }

    async fn set_session(&self, user_id: i64, data: Session) -> StorageResult<()> {
        self.update(user_id, |record| {
            record.merge_session(data);
            true
        })
        .await
    }

    async fn clear_session(&self, user_id: i64) -> StorageResult<()> {
        self.update(user_id, |record| record.session.take().is_some())
            .await
    }
}
