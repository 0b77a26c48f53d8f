//! # Keystone Testkit
//!
//! Testing utilities for Keystone.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: [`TestIdentity`] bundles a keypair, its `did:key` and the
//!   document that identifier implies, and can answer challenges
//! - **Generators**: Proptest strategies for valid and invalid identifiers,
//!   documents and proof statements
//! - **Golden vectors**: Known Ed25519 keys and identifier verdicts
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use keystone_core::validate_did;
//! use keystone_testkit::generators::did_web;
//!
//! proptest! {
//!     #[test]
//!     fn generated_web_dids_validate(did in did_web()) {
//!         prop_assert!(validate_did(&did).valid);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use keystone_testkit::fixtures::TestIdentity;
//!
//! let alice = TestIdentity::with_seed([7; 32]);
//! let envelope = alice.sign_challenge("00ff");
//! assert!(!envelope.is_empty());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{keystone_with_store, TestIdentity};
pub use vectors::{did_vectors, key_vectors, DidVector, KeyVector};
