//! Error types for the store module.

use keystone_core::ErrorKind;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Value serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A lock guarding the backend was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// The blocking task running a query was cancelled or panicked.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Serialization(_) => ErrorKind::InvalidFormat,
            _ => ErrorKind::Storage,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Task(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
