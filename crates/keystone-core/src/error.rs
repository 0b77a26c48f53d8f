//! Error types for Keystone Core.

use std::fmt;

use thiserror::Error;

/// The caller-visible error taxonomy.
///
/// Every crate-level error reduces to one of these kinds at the public
/// boundary. The full cause is recorded in the audit log, never surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller error. Not retried.
    InvalidFormat,
    /// Transient. Back off and retry after the window resets.
    RateLimited,
    /// Every resolution source was exhausted.
    NotFound,
    /// A challenge or session outlived its validity window.
    Expired,
    /// No matching challenge for the presented response.
    Mismatch,
    /// A signature or proof did not check out.
    VerificationFailed,
    /// The persistence capability failed.
    Storage,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Stable lowercase name, used in audit details.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Expired => "expired",
            ErrorKind::Mismatch => "mismatch",
            ErrorKind::VerificationFailed => "verification_failed",
            ErrorKind::Storage => "storage",
            ErrorKind::Internal => "internal",
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    pub const fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::NotFound | ErrorKind::Storage)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core errors for identifiers, documents and key material.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("invalid DID document: {0}")]
    InvalidDocument(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("verification method has no key material: {0}")]
    MissingKeyMaterial(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

impl CoreError {
    /// Reduce to the caller-visible taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidSignature => ErrorKind::VerificationFailed,
            CoreError::EncodingError(_) => ErrorKind::Internal,
            _ => ErrorKind::InvalidFormat,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::DecodingError(e.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
