//! Pluggable persistence capabilities.
//!
//! - [`StateStorage`]: per-user FSM state string and JSON session blob.
//! - [`MetadataCache`]: TTL key-value store memoizing handler parameter metadata.
//!
//! Concrete backends (memory, file, Redis) live in `skiff-framework`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageResult;

/// Per-user session data.
pub type Session = serde_json::Map<String, Value>;

/// A shared state store.
pub type BoxedStorage = Arc<dyn StateStorage>;

/// A shared metadata cache.
pub type BoxedCache = Arc<dyn MetadataCache>;

/// Key-value store for dialog state and session data, keyed by user id.
///
/// Reading an unset key is not an error: `get_state` yields `None` and
/// `get_session` an empty map on every backend.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Returns the user's current state.
    async fn get_state(&self, user_id: i64) -> StorageResult<Option<String>>;

    /// Sets the user's current state.
    async fn set_state(&self, user_id: i64, state: &str) -> StorageResult<()>;

    /// Removes the user's state.
    async fn clear_state(&self, user_id: i64) -> StorageResult<()>;

    /// Returns the user's session, empty if none was stored.
    async fn get_session(&self, user_id: i64) -> StorageResult<Session>;

    /// Merges `data` into the user's session (keys in `data` win).
    async fn set_session(&self, user_id: i64, data: Session) -> StorageResult<()>;

    /// Removes the user's session.
    async fn clear_session(&self, user_id: i64) -> StorageResult<()>;
}

/// TTL cache used to persist handler metadata across runs.
#[async_trait]
pub trait MetadataCache: Send + Sync {
    /// Returns the cached value, `None` when missing or expired.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> StorageResult<()>;

    /// Returns `true` if an unexpired value exists.
    async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }
}
