//! In-process state storage.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use skiff_core::{Session, StateStorage, StorageResult};

use super::Record;

/// Keeps states and sessions in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: RwLock<HashMap<i64, Record>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with stored data.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn update(&self, user_id: i64, f: impl FnOnce(&mut Record)) {
        let mut records = self.records.write();
        let record = records.entry(user_id).or_default();
        f(record);
        if *record == Record::default() {
            records.remove(&user_id);
        }
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn get_state(&self, user_id: i64) -> StorageResult<Option<String>> {
        Ok(self
            .records
            .read()
            .get(&user_id)
            .and_then(|r| r.state.clone()))
    }

    async fn set_state(&self, user_id: i64, state: &str) -> StorageResult<()> {
        self.update(user_id, |r| r.state = Some(state.to_string()));
        Ok(())
    }

    async fn clear_state(&self, user_id: i64) -> StorageResult<()> {
        self.update(user_id, |r| r.state = None);
        Ok(())
    }

    async fn get_session(&self, user_id: i64) -> StorageResult<Session> {
        Ok(self
            .records
            .read()
            .get(&user_id)
            .and_then(|r| r.session.clone())
            .unwrap_or_default())
    }

    async fn set_session(&self, user_id: i64, data: Session) -> StorageResult<()> {
        self.update(user_id, |r| r.merge_session(data));
        Ok(())
    }

    async fn clear_session(&self, user_id: i64) -> StorageResult<()> {
        self.update(user_id, |r| r.session = None);
        Ok(())
    }
}
