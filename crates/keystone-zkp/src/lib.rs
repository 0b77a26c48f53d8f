//! # Keystone ZKP
//!
//! Zero-knowledge proofs that let a holder prove a predicate about private
//! data without disclosing it.
//!
//! ## Proof Families
//!
//! - [`SchnorrProof`] - knowledge of a discrete logarithm, interactive or
//!   Fiat–Shamir, over Ristretto255 or the Ed25519 basepoint
//! - [`PedersenProof`] - knowledge of a commitment opening, specialised to
//!   existence, range and set membership
//! - [`SigmaProof`] - knowledge of witnesses for `Y = Σ x_i·G_i`
//!
//! All three share [`CurveParams`] and a canonical-CBOR [`Transcript`].
//! The [`ProofEngine`] validates statements, generates proofs, verifies
//! them (returning `bool`) and keeps recent proofs in a [`ProofCache`].
//!
//! ```rust,ignore
//! let engine = ProofEngine::default();
//! let proof = engine.generate_range_proof(21, 130)?;
//! assert!(engine.verify_proof(&proof));
//! ```

pub mod cache;
pub mod canonical;
pub mod curve;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod pedersen;
pub mod proof;
pub mod schnorr;
pub mod sigma;
pub mod statement;
pub mod transcript;

pub use cache::{CachedProof, ProofCache, ProofCacheStats};
pub use curve::{ed25519_secret_scalar, CurveParams, Group};
pub use encoding::{HexBytes, PointBytes, ScalarBytes};
pub use engine::{ProofEngine, ProofEngineConfig};
pub use error::{Result, ZkError};
pub use pedersen::{PedersenPredicate, PedersenProof};
pub use proof::{ProofBody, ProofId, ProofMetadata, ZkProof};
pub use schnorr::{SchnorrCommitment, SchnorrProof};
pub use sigma::SigmaProof;
pub use statement::{ProofFamily, Statement, StatementType};
pub use transcript::{HashFunction, Transcript, TransformKind};

pub use curve25519_dalek::Scalar;
