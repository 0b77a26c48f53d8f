//! Error types for DID resolution.

use keystone_core::{CoreError, ErrorKind};
use keystone_store::StoreError;
use thiserror::Error;

/// Errors that can occur while resolving or publishing documents.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("invalid DID: {0}")]
    InvalidFormat(String),

    #[error("rate limited, retry after {retry_after_ms} ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("no source could resolve {0}")]
    NotFound(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("source timed out after {0} ms")]
    Timeout(u64),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ResolutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolutionError::InvalidFormat(_) | ResolutionError::InvalidDocument(_) => {
                ErrorKind::InvalidFormat
            }
            ResolutionError::RateLimited { .. } => ErrorKind::RateLimited,
            ResolutionError::NotFound(_) => ErrorKind::NotFound,
            ResolutionError::Fetch(_) | ResolutionError::Timeout(_) => ErrorKind::Internal,
            ResolutionError::Store(_) => ErrorKind::Storage,
        }
    }
}

impl From<CoreError> for ResolutionError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidDid(msg) => ResolutionError::InvalidFormat(msg),
            other => ResolutionError::InvalidDocument(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ResolutionError {
    fn from(e: reqwest::Error) -> Self {
        ResolutionError::Fetch(e.to_string())
    }
}

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, ResolutionError>;
