//! In-memory implementation of the KeyValueStore trait.
//!
//! Useful for testing and for deployments that accept losing sessions on
//! restart.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::traits::KeyValueStore;

/// In-memory store backed by an ordered map.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        inner.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::KeyValueStoreExt;
    use serde::{Deserialize, Serialize};

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", b"1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));
        assert!(store.contains("a").await.unwrap());

        store.set("a", b"2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_delete_idempotent() {
        let store = MemoryStore::new();
        store.set("a", b"1").await.unwrap();
        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_list_prefix() {
        let store = MemoryStore::new();
        for key in ["session:b", "session:a", "challenge:a", "sessions", "session"] {
            store.set(key, b"x").await.unwrap();
        }
        let keys = store.list("session:").await.unwrap();
        assert_eq!(keys, vec!["session:a".to_string(), "session:b".to_string()]);
        assert_eq!(store.list("").await.unwrap().len(), 5);
        assert!(store.list("zzz").await.unwrap().is_empty());
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryStore::new();
        let record = Record {
            name: "device".into(),
            count: 3,
        };
        store.set_json("r", &record).await.unwrap();
        let back: Option<Record> = store.get_json("r").await.unwrap();
        assert_eq!(back, Some(record));

        store.set("bad", b"not json").await.unwrap();
        assert!(store.get_json::<Record>("bad").await.is_err());
    }
}
