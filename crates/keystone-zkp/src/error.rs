//! Error types for proof generation.
//!
//! Only generation fails with an error. Verification answers `bool`.

use keystone_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZkError {
    #[error("malformed statement: {0}")]
    MalformedStatement(String),

    #[error("value {value} is outside [0, {range})")]
    OutOfRange { value: u64, range: u64 },

    #[error("value is not a member of the public set")]
    NotAMember,

    #[error("interactive challenge required for {0}")]
    MissingChallenge(&'static str),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl ZkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ZkError::Encoding(_) => ErrorKind::Internal,
            _ => ErrorKind::InvalidFormat,
        }
    }
}

/// Result type for proof operations.
pub type Result<T> = std::result::Result<T, ZkError>;
