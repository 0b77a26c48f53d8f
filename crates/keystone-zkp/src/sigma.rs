//! Sigma protocol for linear relations, made non-interactive.
//!
//! Proves knowledge of `x_1..x_k` with `Y = Σ x_i·G_i` where each `G_i` is
//! named by a label in the metadata. With one term and label `G` this is
//! Schnorr over Ristretto255.

use curve25519_dalek::{RistrettoPoint, Scalar};
use serde::{Deserialize, Serialize};

use crate::curve::{random_scalar, CurveParams};
use crate::encoding::{PointBytes, ScalarBytes};
use crate::error::{Result, ZkError};
use crate::proof::ProofMetadata;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigmaProof {
    pub public_value: PointBytes,
    pub commitment: PointBytes,
    pub challenge: ScalarBytes,
    pub responses: Vec<ScalarBytes>,
}

fn combine(generators: &[RistrettoPoint], scalars: &[Scalar]) -> RistrettoPoint {
    generators.iter().zip(scalars).map(|(g, s)| g * s).sum()
}

impl SigmaProof {
    pub(crate) fn prove(
        params: &CurveParams,
        witnesses: &[Scalar],
        metadata: &ProofMetadata,
    ) -> Result<Self> {
        if witnesses.len() != metadata.generators.len() {
            return Err(ZkError::MalformedStatement(format!(
                "{} witnesses for {} generators",
                witnesses.len(),
                metadata.generators.len()
            )));
        }
        let generators: Vec<RistrettoPoint> = metadata
            .generators
            .iter()
            .map(|label| params.generator(label))
            .collect();
        let nonces: Vec<Scalar> = witnesses.iter().map(|_| random_scalar()).collect();

        let mut proof = Self {
            public_value: PointBytes::from_ristretto(&combine(&generators, witnesses)),
            commitment: PointBytes::from_ristretto(&combine(&generators, &nonces)),
            challenge: ScalarBytes([0u8; 32]),
            responses: Vec::new(),
        };
        let c = proof.challenge_for(metadata)?;
        proof.challenge = ScalarBytes::from_scalar(&c);
        proof.responses = nonces
            .iter()
            .zip(witnesses)
            .map(|(w, x)| ScalarBytes::from_scalar(&(w + c * x)))
            .collect();
        Ok(proof)
    }

    fn challenge_for(&self, metadata: &ProofMetadata) -> Result<Scalar> {
        let mut t = metadata.transcript();
        t.append_point("public", &self.public_value)
            .append_point("commitment", &self.commitment);
        t.challenge()
    }

    pub(crate) fn verify(&self, params: &CurveParams, metadata: &ProofMetadata) -> bool {
        if self.responses.is_empty() || self.responses.len() != metadata.generators.len() {
            return false;
        }
        let Some(c) = self.challenge.to_scalar() else {
            return false;
        };
        let Some(z) = self
            .responses
            .iter()
            .map(ScalarBytes::to_scalar)
            .collect::<Option<Vec<_>>>()
        else {
            return false;
        };
        let (Some(y), Some(t)) = (
            self.public_value.to_ristretto_nonidentity(),
            self.commitment.to_ristretto(),
        ) else {
            return false;
        };
        match self.challenge_for(metadata) {
            Ok(expected) if expected == c => {}
            _ => return false,
        }
        let generators: Vec<RistrettoPoint> = metadata
            .generators
            .iter()
            .map(|label| params.generator(label))
            .collect();
        combine(&generators, &z) == t + y * c
    }
}
