//! # Keystone Store
//!
//! The key-value persistence capability Keystone consumes, with SQLite and
//! in-memory implementations.
//!
//! ## Key Types
//!
//! - [`KeyValueStore`] - The async trait every backend implements
//! - [`KeyValueStoreExt`] - JSON helpers over any backend
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keystone_store::{KeyValueStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("keystone.db").unwrap();
//!     store.set("device-id", b"4f2a").await.unwrap();
//!     let keys = store.list("session:").await.unwrap();
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{KeyValueStore, KeyValueStoreExt};
