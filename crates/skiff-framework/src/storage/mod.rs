//! [`StateStorage`](skiff_core::StateStorage) backends.
//!
//! | Backend          | Layout                                             |
//! |------------------|----------------------------------------------------|
//! | [`MemoryStorage`] | process memory, lost on restart                   |
//! | [`FileStorage`]   | `{dir}/{user_id}.json` with `state` and `session` |
//! | `RedisStorage`    | hash `{prefix}{user_id}`, fields `state`/`session` (feature `redis`) |

mod file;
mod memory;
#[cfg(feature = "redis")]
mod redis;

use serde::{Deserialize, Serialize};
use skiff_core::Session;

pub use file::{DEFAULT_SESSION_DIR, FileStorage};
pub use memory::MemoryStorage;
#[cfg(feature = "redis")]
pub use self::redis::{DEFAULT_PREFIX, RedisStorage};

/// What is stored for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<Session>,
}

impl Record {
    fn merge_session(&mut self, data: Session) {
        self.session.get_or_insert_with(Session::new).extend(data);
    }
}
