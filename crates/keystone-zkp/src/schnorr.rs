//! Schnorr proof of knowledge of a discrete logarithm.
//!
//! ```text
//! Prover                          Verifier
//!   y = x·B, w random, A = w·B
//!   ---------------- y, A ---------------->
//!   <--------------- c --------------------   (or c = H(transcript, y, A, m))
//!   z = w + c·x
//!   ---------------- z ------------------->
//!                                 z·B == A + c·y
//! ```

use curve25519_dalek::{EdwardsPoint, RistrettoPoint, Scalar};
use serde::{Deserialize, Serialize};

use crate::curve::{random_scalar, Group};
use crate::encoding::{HexBytes, PointBytes, ScalarBytes};
use crate::error::Result;
use crate::proof::ProofMetadata;
use crate::transcript::TransformKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchnorrProof {
    pub public_key: PointBytes,
    pub commitment: PointBytes,
    pub challenge: ScalarBytes,
    pub response: ScalarBytes,
    /// Bytes bound into the Fiat–Shamir challenge.
    pub message: HexBytes,
}

fn base_mul(group: Group, s: &Scalar) -> PointBytes {
    match group {
        Group::Ristretto255 => PointBytes::from_ristretto(&RistrettoPoint::mul_base(s)),
        Group::Ed25519 => PointBytes::from_edwards(&EdwardsPoint::mul_base(s)),
    }
}

/// The prover's first move.
///
/// Holds the witness `w` until [`respond`](Self::respond) consumes it, so a
/// commitment can never answer two challenges.
pub struct SchnorrCommitment {
    group: Group,
    witness: Scalar,
    public_key: PointBytes,
    commitment: PointBytes,
}

impl SchnorrCommitment {
    pub fn commit(group: Group, secret: &Scalar) -> Self {
        let witness = random_scalar();
        Self {
            group,
            public_key: base_mul(group, secret),
            commitment: base_mul(group, &witness),
            witness,
        }
    }

    pub fn group(&self) -> Group {
        self.group
    }

    pub fn public_key(&self) -> PointBytes {
        self.public_key
    }

    pub fn commitment(&self) -> PointBytes {
        self.commitment
    }

    /// `z = w + c·x`.
    pub fn respond(self, secret: &Scalar, challenge: &Scalar) -> Scalar {
        self.witness + challenge * secret
    }
}

impl SchnorrProof {
    /// Run the protocol. `challenge` is used as-is for interactive
    /// transcripts and ignored for Fiat–Shamir.
    pub(crate) fn prove(
        secret: &Scalar,
        message: &[u8],
        challenge: Option<Scalar>,
        metadata: &ProofMetadata,
    ) -> Result<Self> {
        let round = SchnorrCommitment::commit(metadata.curve, secret);
        let mut proof = Self {
            public_key: round.public_key(),
            commitment: round.commitment(),
            challenge: ScalarBytes([0u8; 32]),
            response: ScalarBytes([0u8; 32]),
            message: HexBytes(message.to_vec()),
        };
        let c = match (metadata.transform, challenge) {
            (TransformKind::Interactive, Some(c)) => c,
            _ => proof.fiat_shamir_challenge(metadata)?,
        };
        proof.challenge = ScalarBytes::from_scalar(&c);
        proof.response = ScalarBytes::from_scalar(&round.respond(secret, &c));
        Ok(proof)
    }

    pub(crate) fn fiat_shamir_challenge(&self, metadata: &ProofMetadata) -> Result<Scalar> {
        let mut t = metadata.transcript();
        t.append_point("public", &self.public_key)
            .append_point("commitment", &self.commitment)
            .append_bytes("message", &self.message.0);
        t.challenge()
    }

    /// Check `c, z < n`, the challenge derivation and `z·B == A + c·y`.
    pub(crate) fn verify(&self, metadata: &ProofMetadata) -> bool {
        let (Some(c), Some(z)) = (self.challenge.to_scalar(), self.response.to_scalar()) else {
            return false;
        };
        if c == Scalar::ZERO {
            return false;
        }
        if metadata.transform == TransformKind::FiatShamir {
            match self.fiat_shamir_challenge(metadata) {
                Ok(expected) if expected == c => {}
                _ => return false,
            }
        }

        match metadata.curve {
            Group::Ristretto255 => {
                let (Some(y), Some(a)) = (
                    self.public_key.to_ristretto_nonidentity(),
                    self.commitment.to_ristretto(),
                ) else {
                    return false;
                };
                RistrettoPoint::mul_base(&z) == a + y * c
            }
            Group::Ed25519 => {
                let (Some(y), Some(a)) = (
                    self.public_key.to_edwards_nonidentity(),
                    self.commitment.to_edwards(),
                ) else {
                    return false;
                };
                EdwardsPoint::mul_base(&z) == a + y * c
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::StatementType;
    use crate::transcript::HashFunction;

    fn metadata(curve: Group, transform: TransformKind) -> ProofMetadata {
        ProofMetadata {
            statement: StatementType::DiscreteLog,
            curve,
            hash: HashFunction::Blake3,
            transform,
            generators: vec!["G".into()],
            security_level: 128,
            created_at: 0,
            expires_at: i64::MAX,
        }
    }

    #[test]
    fn test_fiat_shamir_completeness() {
        let x = random_scalar();
        for curve in [Group::Ristretto255, Group::Ed25519] {
            let meta = metadata(curve, TransformKind::FiatShamir);
            let proof = SchnorrProof::prove(&x, b"msg", None, &meta).unwrap();
            assert!(proof.verify(&meta));
        }
    }

    #[test]
    fn test_interactive_uses_supplied_challenge() {
        let x = random_scalar();
        let c = random_scalar();
        let meta = metadata(Group::Ristretto255, TransformKind::Interactive);
        let proof = SchnorrProof::prove(&x, b"", Some(c), &meta).unwrap();
        assert_eq!(proof.challenge.to_scalar(), Some(c));
        assert!(proof.verify(&meta));
    }

    #[test]
    fn test_three_move_round() {
        let x = random_scalar();
        let round = SchnorrCommitment::commit(Group::Ristretto255, &x);
        let (y, a) = (round.public_key(), round.commitment());
        let c = random_scalar();
        let z = round.respond(&x, &c);

        let lhs = RistrettoPoint::mul_base(&z);
        let rhs = a.to_ristretto().unwrap() + y.to_ristretto().unwrap() * c;
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_wrong_message_fails() {
        let x = random_scalar();
        let meta = metadata(Group::Ristretto255, TransformKind::FiatShamir);
        let mut proof = SchnorrProof::prove(&x, b"nonce-a", None, &meta).unwrap();
        proof.message = HexBytes(b"nonce-b".to_vec());
        assert!(!proof.verify(&meta));
    }

    #[test]
    fn test_non_canonical_response_fails() {
        let x = random_scalar();
        let meta = metadata(Group::Ristretto255, TransformKind::FiatShamir);
        let mut proof = SchnorrProof::prove(&x, b"", None, &meta).unwrap();
        proof.response = ScalarBytes([0xff; 32]);
        assert!(!proof.verify(&meta));
    }

    #[test]
    fn test_curve_mismatch_fails() {
        let x = random_scalar();
        let meta = metadata(Group::Ristretto255, TransformKind::FiatShamir);
        let proof = SchnorrProof::prove(&x, b"", None, &meta).unwrap();
        assert!(!proof.verify(&metadata(Group::Ed25519, TransformKind::FiatShamir)));
    }
}
