//! KeyValueStore trait: the persistence capability Keystone consumes.
//!
//! Sessions, challenges, published documents and the device id all live
//! behind string keys. Any backend that can get, set and delete bytes by key
//! satisfies it, including a memory-only one.

use std::future::Future;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Async key-value persistence.
///
/// All methods are async to support both blocking (SQLite) and async
/// backends. For SQLite, `spawn_blocking` is used internally.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`. Returns whether a value was present.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// All keys starting with `prefix`, in lexicographic order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Whether a value exists under `key`.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Extension trait for storing JSON values.
pub trait KeyValueStoreExt: KeyValueStore {
    /// Fetch and decode a JSON value.
    fn get_json<T: DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Encode and store a JSON value.
    fn set_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, &bytes).await
    }
}
