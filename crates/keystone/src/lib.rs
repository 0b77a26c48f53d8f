//! # Keystone
//!
//! Self-sovereign identity for agents: resolve a DID to a verified
//! document, turn a signed challenge into a time-bounded session, and
//! prove predicates about private data with zero-knowledge proofs.
//!
//! ## Overview
//!
//! - [`Keystone`] - the context wiring every component once
//! - [`Authenticator`] - challenge-response authentication and sessions
//! - [`keystone_resolver::Resolver`] - multi-source DID resolution
//! - [`keystone_zkp::ProofEngine`] - Schnorr, Pedersen and Sigma proofs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keystone::{Keystone, SignatureEnvelope};
//! use keystone_core::Keypair;
//!
//! async fn example() {
//!     let keystone = Keystone::in_memory();
//!     let holder = Keypair::generate();
//!     let did = holder.did_key();
//!
//!     let challenge = keystone.create_challenge(&did, None).await.unwrap();
//!     let envelope = SignatureEnvelope::sign(&holder, &challenge.nonce).encode().unwrap();
//!     let session = keystone.authenticate(&did, &envelope).await;
//!     assert!(session.is_some());
//! }
//! ```

pub mod authenticator;
pub mod config;
pub mod context;
pub mod error;
pub mod session;

pub use authenticator::Authenticator;
pub use config::{AuthConfig, KeystoneConfig, NetworkConfig};
pub use context::{Keystone, KeystoneBuilder};
pub use error::{AuthError, KeystoneError, Result};
pub use session::{Challenge, Permission, Session, SignatureEnvelope};
