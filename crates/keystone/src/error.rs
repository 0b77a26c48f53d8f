//! Error types for Keystone.

use keystone_core::{CoreError, ErrorKind};
use keystone_resolver::ResolutionError;
use keystone_store::StoreError;
use keystone_zkp::ZkError;
use thiserror::Error;

/// Why an authentication step failed.
///
/// [`Authenticator::authenticate`](crate::Authenticator::authenticate) never
/// returns these. They are recorded to the audit log and collapsed to `None`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid DID: {0}")]
    InvalidFormat(String),

    #[error("rate limited, retry after {retry_after_ms} ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("malformed signature envelope: {0}")]
    InvalidEnvelope(String),

    #[error("no pending challenge")]
    NoChallenge,

    #[error("challenge expired")]
    Expired,

    #[error("nonce does not match the pending challenge")]
    Mismatch,

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// Backend detail stays out of `Display`; see [`AuthError::cause`].
    #[error("storage unavailable")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Full description for the audit log, including backend detail.
    pub fn cause(&self) -> String {
        match self {
            AuthError::Store(e) => format!("{self}: {e}"),
            other => other.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidFormat(_) | AuthError::InvalidEnvelope(_) => ErrorKind::InvalidFormat,
            AuthError::RateLimited { .. } => ErrorKind::RateLimited,
            AuthError::NoChallenge | AuthError::Mismatch => ErrorKind::Mismatch,
            AuthError::Expired => ErrorKind::Expired,
            AuthError::VerificationFailed(_) => ErrorKind::VerificationFailed,
            AuthError::Resolution(e) => e.kind(),
            AuthError::Store(e) => e.kind(),
        }
    }
}

impl From<CoreError> for AuthError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidDid(msg) => AuthError::InvalidFormat(msg),
            other => AuthError::VerificationFailed(other.to_string()),
        }
    }
}

/// Errors surfaced by the [`Keystone`](crate::Keystone) context.
#[derive(Debug, Error)]
pub enum KeystoneError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Proof(#[from] ZkError),

    #[error("storage unavailable")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl KeystoneError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeystoneError::Auth(e) => e.kind(),
            KeystoneError::Resolution(e) => e.kind(),
            KeystoneError::Proof(e) => e.kind(),
            KeystoneError::Store(e) => e.kind(),
            KeystoneError::Config(_) => ErrorKind::InvalidFormat,
        }
    }
}

/// Result type for Keystone operations.
pub type Result<T> = std::result::Result<T, KeystoneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_failures_share_a_kind() {
        assert_eq!(AuthError::NoChallenge.kind(), ErrorKind::Mismatch);
        assert_eq!(AuthError::Mismatch.kind(), ErrorKind::Mismatch);
        assert_eq!(AuthError::Expired.kind(), ErrorKind::Expired);
    }

    #[test]
    fn test_store_detail_hidden_from_display() {
        let err = AuthError::from(StoreError::Task("disk quota exceeded".into()));
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(!err.to_string().contains("quota"));
        assert!(err.cause().contains("disk quota exceeded"));

        let err = KeystoneError::from(StoreError::Task("disk quota exceeded".into()));
        assert!(!err.to_string().contains("quota"));
    }

    #[test]
    fn test_layer_kinds_pass_through() {
        let err: KeystoneError = ResolutionError::NotFound("did:example:a".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err: KeystoneError = AuthError::from(CoreError::InvalidDid("x".into())).into();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }
}
