//! Pedersen commitments and proof of knowledge of an opening.
//!
//! `C = m·G + r·H`. The prover shows it knows `(m, r)` with the usual
//! two-response Sigma protocol: `T = a·G + b·H`, `z1 = a + c·m`,
//! `z2 = b + c·r`, accepted when `z1·G + z2·H == T + c·C`.
//!
//! Range and membership statements are checked at generation time and
//! recorded as a [`PedersenPredicate`]. Cryptographically they are the
//! same opening proof.

use curve25519_dalek::{RistrettoPoint, Scalar};
use serde::{Deserialize, Serialize};

use crate::curve::{random_scalar, CurveParams};
use crate::encoding::{PointBytes, ScalarBytes};
use crate::error::Result;
use crate::proof::ProofMetadata;
use crate::statement::StatementType;

/// The public shape of the committed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PedersenPredicate {
    Opening,
    Range { range: u64 },
    Membership { set: Vec<String> },
}

impl PedersenPredicate {
    /// Whether this predicate belongs to `statement`.
    pub fn matches(&self, statement: StatementType) -> bool {
        matches!(
            (self, statement),
            (PedersenPredicate::Opening, StatementType::Existence)
                | (PedersenPredicate::Range { .. }, StatementType::Range)
                | (PedersenPredicate::Membership { .. }, StatementType::Membership)
        )
    }
}

/// `C = m·G + r·H` with a fresh blinding factor.
pub fn commit(params: &CurveParams, value: &Scalar) -> (RistrettoPoint, Scalar) {
    let blinding = random_scalar();
    (params.g() * value + params.h() * blinding, blinding)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PedersenProof {
    pub commitment: PointBytes,
    pub nonce_commitment: PointBytes,
    pub challenge: ScalarBytes,
    pub response_value: ScalarBytes,
    pub response_blinding: ScalarBytes,
    pub predicate: PedersenPredicate,
}

impl PedersenProof {
    pub(crate) fn prove(
        params: &CurveParams,
        value: &Scalar,
        predicate: PedersenPredicate,
        metadata: &ProofMetadata,
    ) -> Result<Self> {
        let (c_point, r) = commit(params, value);
        let (a, b) = (random_scalar(), random_scalar());
        let t_point = params.g() * a + params.h() * b;

        let mut proof = Self {
            commitment: PointBytes::from_ristretto(&c_point),
            nonce_commitment: PointBytes::from_ristretto(&t_point),
            challenge: ScalarBytes([0u8; 32]),
            response_value: ScalarBytes([0u8; 32]),
            response_blinding: ScalarBytes([0u8; 32]),
            predicate,
        };
        let c = proof.challenge_for(metadata)?;
        proof.challenge = ScalarBytes::from_scalar(&c);
        proof.response_value = ScalarBytes::from_scalar(&(a + c * value));
        proof.response_blinding = ScalarBytes::from_scalar(&(b + c * r));
        Ok(proof)
    }

    fn challenge_for(&self, metadata: &ProofMetadata) -> Result<Scalar> {
        let mut t = metadata.transcript();
        t.append_point("commitment", &self.commitment)
            .append_point("nonce", &self.nonce_commitment);
        match &self.predicate {
            PedersenPredicate::Opening => {}
            PedersenPredicate::Range { range } => {
                t.append_u64("range", *range);
            }
            PedersenPredicate::Membership { set } => {
                t.append_texts("set", set);
            }
        }
        t.challenge()
    }

    pub(crate) fn verify(&self, params: &CurveParams, metadata: &ProofMetadata) -> bool {
        if !self.predicate.matches(metadata.statement) {
            return false;
        }
        let (Some(c), Some(z1), Some(z2)) = (
            self.challenge.to_scalar(),
            self.response_value.to_scalar(),
            self.response_blinding.to_scalar(),
        ) else {
            return false;
        };
        let (Some(c_point), Some(t_point)) = (
            self.commitment.to_ristretto_nonidentity(),
            self.nonce_commitment.to_ristretto(),
        ) else {
            return false;
        };
        match self.challenge_for(metadata) {
            Ok(expected) if expected == c => {}
            _ => return false,
        }
        params.g() * z1 + params.h() * z2 == t_point + c_point * c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Group;
    use crate::transcript::{HashFunction, TransformKind};

    fn metadata(statement: StatementType) -> ProofMetadata {
        ProofMetadata {
            statement,
            curve: Group::Ristretto255,
            hash: HashFunction::Sha256,
            transform: TransformKind::FiatShamir,
            generators: vec!["G".into(), "H".into()],
            security_level: 128,
            created_at: 0,
            expires_at: i64::MAX,
        }
    }

    #[test]
    fn test_opening_completeness() {
        let params = CurveParams::standard();
        let meta = metadata(StatementType::Existence);
        let proof =
            PedersenProof::prove(&params, &Scalar::from(9u64), PedersenPredicate::Opening, &meta)
                .unwrap();
        assert!(proof.verify(&params, &meta));
    }

    #[test]
    fn test_commitment_hides_value() {
        let params = CurveParams::standard();
        let (c1, _) = commit(&params, &Scalar::from(5u64));
        let (c2, _) = commit(&params, &Scalar::from(5u64));
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_predicate_must_match_statement() {
        let params = CurveParams::standard();
        let meta = metadata(StatementType::Range);
        let proof = PedersenProof::prove(
            &params,
            &Scalar::from(3u64),
            PedersenPredicate::Range { range: 10 },
            &meta,
        )
        .unwrap();
        assert!(proof.verify(&params, &meta));
        assert!(!proof.verify(&params, &metadata(StatementType::Membership)));
    }

    #[test]
    fn test_predicate_bound_into_challenge() {
        let params = CurveParams::standard();
        let meta = metadata(StatementType::Range);
        let mut proof = PedersenProof::prove(
            &params,
            &Scalar::from(3u64),
            PedersenPredicate::Range { range: 10 },
            &meta,
        )
        .unwrap();
        proof.predicate = PedersenPredicate::Range { range: 4 };
        assert!(!proof.verify(&params, &meta));
    }

    #[test]
    fn test_tampered_response_fails() {
        let params = CurveParams::standard();
        let meta = metadata(StatementType::Existence);
        let mut proof =
            PedersenProof::prove(&params, &Scalar::from(1u64), PedersenPredicate::Opening, &meta)
                .unwrap();
        let z = proof.response_blinding.to_scalar().unwrap() + Scalar::ONE;
        proof.response_blinding = ScalarBytes::from_scalar(&z);
        assert!(!proof.verify(&params, &meta));
    }
}
