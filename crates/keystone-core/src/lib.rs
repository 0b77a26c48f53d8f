//! # Keystone Core
//!
//! Pure primitives for Keystone: decentralized identifiers, DID documents,
//! their validation, and the Ed25519 key encodings documents carry.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Did`] - A validated identifier
//! - [`DidDocument`] - Resolved metadata for a DID
//! - [`Ed25519PublicKey`] / [`Keypair`] - Signature primitive
//! - [`AuditLog`] - Bounded audit trail shared by higher layers
//! - [`ErrorKind`] - Caller-visible error taxonomy
//!
//! ## Validation
//!
//! [`validate_did`] and [`validate_document`] return reports rather than
//! errors. See [`validation`] module.

pub mod audit;
pub mod crypto;
pub mod did;
pub mod document;
pub mod error;
pub mod time;
pub mod validation;

pub use audit::{AuditEntry, AuditLog, DEFAULT_AUDIT_CAPACITY};
pub use crypto::{constant_time_eq, random_bytes, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use did::{Did, DidMethod, MAX_DID_LENGTH};
pub use document::{DidDocument, Jwk, Service, VerificationMethod};
pub use error::{CoreError, ErrorKind, Result};
pub use time::now_millis;
pub use validation::{
    validate_did, validate_document, validate_document_with_limit, DidValidation,
    DocumentValidation, MAX_DOCUMENT_SIZE,
};
