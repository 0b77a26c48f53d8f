//! SQLite implementation of the KeyValueStore trait.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use keystone_core::now_millis;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::KeyValueStore;

/// SQLite-based store.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path.as_ref())?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.as_ref().display(), "opened sqlite store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// When `key` was last written, in Unix milliseconds.
    ///
    /// Rows carried over from a version 1 schema report `0`.
    pub async fn updated_at(&self, key: &str) -> Result<Option<i64>> {
        let key = key.to_string();
        self.run(move |conn| {
            conn.query_row("SELECT updated_at FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    /// Run a closure against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&conn)
        })
        .await?
    }
}

/// Escape LIKE wildcards so a prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = key.to_string();
        self.run(move |conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let key = key.to_string();
        let value = value.to_vec();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.run(move |conn| {
            let removed = conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let pattern = like_prefix(prefix);
        self.run(move |conn| {
            let mut stmt =
                conn.prepare("SELECT key FROM kv WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key")?;
            let keys = stmt
                .query_map(params![pattern], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(keys)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::KeyValueStoreExt;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", b"v1").await.unwrap();
        store.set("k", b"v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v2".to_vec()));

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_records_write_time() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(store.updated_at("k").await.unwrap(), None);

        let before = now_millis();
        store.set("k", b"v1").await.unwrap();
        let first = store.updated_at("k").await.unwrap().unwrap();
        assert!(first >= before);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.set("k", b"v2").await.unwrap();
        let second = store.updated_at("k").await.unwrap().unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_list_escapes_wildcards() {
        let store = SqliteStore::open_memory().unwrap();
        for key in ["a_b:1", "a_b:2", "axb:3", "a%:4"] {
            store.set(key, b"x").await.unwrap();
        }
        assert_eq!(
            store.list("a_b:").await.unwrap(),
            vec!["a_b:1".to_string(), "a_b:2".to_string()]
        );
        assert_eq!(store.list("a%").await.unwrap(), vec!["a%:4".to_string()]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystone.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set_json("session:did:example:a", &vec!["read"]).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let value: Option<Vec<String>> = store.get_json("session:did:example:a").await.unwrap();
        assert_eq!(value, Some(vec!["read".to_string()]));
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let store = SqliteStore::open_memory().unwrap();
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.set(&format!("k{i:02}"), &[i as u8]).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.list("k").await.unwrap().len(), 16);
    }
}
