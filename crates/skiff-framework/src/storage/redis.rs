//! Redis-backed state storage.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use skiff_core::{Session, StateStorage, StorageError, StorageResult};
use tracing::warn;

/// Default key prefix of [`RedisStorage`].
pub const DEFAULT_PREFIX: &str = "skiff_fsm:";

/// Stores each user as a hash `{prefix}{user_id}` with the fields `state`
/// and `session` (JSON).
///
/// Reads that fail are logged and treated as unset.
#[derive(Clone)]
pub struct RedisStorage {
    conn: MultiplexedConnection,
    prefix: String,
}

impl RedisStorage {
    /// Connects to `url` (`redis://host:port/db`).
    pub async fn connect(url: &str, prefix: impl Into<String>) -> StorageResult<Self> {
        let client = redis::Client::open(url).map_err(backend)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend)?;
        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    fn key(&self, user_id: i64) -> String {
        format!("{}{user_id}", self.prefix)
    }

    async fn read(&self, user_id: i64, field: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        let value: redis::RedisResult<Option<String>> = conn.hget(self.key(user_id), field).await;
        match value {
            Ok(value) => value,
            Err(e) => {
                warn!(user_id, field, error = %e, "Redis read failed");
                None
            }
        }
    }

    async fn write(&self, user_id: i64, field: &str, value: String) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        let written: redis::RedisResult<()> = conn.hset(self.key(user_id), field, value).await;
        written.map_err(backend)
    }

    async fn remove(&self, user_id: i64, field: &str) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        let removed: redis::RedisResult<()> = conn.hdel(self.key(user_id), field).await;
        removed.map_err(backend)
    }
}

fn backend(err: redis::RedisError) -> StorageError {
    StorageError::Backend(err.to_string())
}

#[async_trait]
impl StateStorage for RedisStorage {
    async fn get_state(&self, user_id: i64) -> StorageResult<Option<String>> {
        Ok(self.read(user_id, "state").await)
    }

    async fn set_state(&self, user_id: i64, state: &str) -> StorageResult<()> {
        self.write(user_id, "state", state.to_string()).await
    }

    async fn clear_state(&self, user_id: i64) -> StorageResult<()> {
        self.remove(user_id, "state").await
    }

    async fn get_session(&self, user_id: i64) -> StorageResult<Session> {
        let Some(raw) = self.read(user_id, "session").await else {
            return Ok(Session::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(user_id, error = %e, "Ignoring corrupt session");
            Session::new()
        }))
    }

    async fn set_session(&self, user_id: i64, data: Session) -> StorageResult<()> {
        let mut session = self.get_session(user_id).await?;
        session.extend(data);
        let encoded = serde_json::to_string(&session)?;
        self.write(user_id, "session", encoded).await
    }

    async fn clear_session(&self, user_id: i64) -> StorageResult<()> {
        self.remove(user_id, "session").await
    }
}

impl std::fmt::Debug for RedisStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStorage")
            .field("prefix", &self.prefix)
            .finish()
    }
}
