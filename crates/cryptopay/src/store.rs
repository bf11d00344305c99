use dashmap::DashMap;

use crate::error::PayError;

/// String key/value storage for persisted client state.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, PayError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), PayError>;
}

/// In-memory store backed by DashMap. Fast but lost on restart.
#[derive(Default)]
pub struct InMemoryStore {
    entries: DashMap<String, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PayError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PayError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(feature = "full")]
pub use sqlite::SqliteStore;

#[cfg(feature = "full")]
mod sqlite {
    use std::sync::{Mutex, MutexGuard};

    use rusqlite::{params, Connection, OptionalExtension};

    use super::KeyValueStore;
    use crate::error::PayError;

    /// Persistent store backed by SQLite. One row per key.
    pub struct SqliteStore {
        conn: Mutex<Connection>,
    }

    impl SqliteStore {
        /// Open (or create) a SQLite state database at the given path.
        ///
        /// On Unix the file is restricted to 0600, since it records who paid whom.
        pub fn open(path: &str) -> Result<Self, PayError> {
            let conn = Connection::open(path)?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS kv_state (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                PRAGMA journal_mode=WAL;",
            )?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) =
                    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                {
                    tracing::warn!(
                        path = %path,
                        error = %e,
                        "failed to set state database file permissions to 0600"
                    );
                }
            }

            Ok(Self {
                conn: Mutex::new(conn),
            })
        }

        fn lock(&self) -> MutexGuard<'_, Connection> {
            match self.conn.lock() {
                Ok(c) => c,
                Err(poisoned) => {
                    tracing::error!("state store mutex poisoned, recovering");
                    poisoned.into_inner()
                }
            }
        }
    }

    impl KeyValueStore for SqliteStore {
        fn get(&self, key: &str) -> Result<Option<String>, PayError> {
            let conn = self.lock();
            let value: Option<String> = conn
                .query_row(
                    "SELECT value FROM kv_state WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), PayError> {
            let conn = self.lock();
            let now = chrono::Utc::now().timestamp();
            conn.execute(
                "INSERT INTO kv_state (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
            Ok(())
        }
    }
}
