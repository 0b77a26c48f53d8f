//! The proof engine: one place to generate, verify and cache proofs.

use curve25519_dalek::Scalar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use keystone_core::time::{duration_millis, serde_millis};
use keystone_core::{now_millis, AuditLog, Keypair, DEFAULT_AUDIT_CAPACITY};

use crate::cache::{events, ProofCache, ProofCacheStats};
use crate::curve::{
    attribute_scalar, ed25519_secret_scalar, CurveParams, Group, B, G, H, MAX_SECURITY_LEVEL,
};
use crate::error::{Result, ZkError};
use crate::pedersen::{PedersenPredicate, PedersenProof};
use crate::proof::{ProofBody, ProofId, ProofMetadata, ZkProof};
use crate::schnorr::SchnorrProof;
use crate::sigma::SigmaProof;
use crate::statement::{Statement, StatementType, MAX_LINEAR_TERMS, MAX_MEMBERSHIP_SET};
use crate::transcript::{HashFunction, TransformKind};

/// Proof engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProofEngineConfig {
    /// Maximum number of cached proofs.
    pub capacity: usize,
    /// Lifetime of a generated proof.
    #[serde(with = "serde_millis")]
    pub proof_ttl: Duration,
    /// Claimed security level in bits, recorded in every proof.
    pub security_level: u32,
    pub default_hash: HashFunction,
    pub audit_capacity: usize,
}

impl Default for ProofEngineConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            proof_ttl: Duration::from_secs(60 * 60),
            security_level: MAX_SECURITY_LEVEL,
            default_hash: HashFunction::Blake3,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}

#[derive(Debug)]
pub struct ProofEngine {
    params: CurveParams,
    config: ProofEngineConfig,
    cache: ProofCache,
}

impl ProofEngine {
    pub fn new(config: ProofEngineConfig) -> Self {
        Self {
            params: CurveParams::standard(),
            cache: ProofCache::new(config.capacity, config.audit_capacity),
            config,
        }
    }

    pub fn params(&self) -> &CurveParams {
        &self.params
    }

    pub fn config(&self) -> &ProofEngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ProofCache {
        &self.cache
    }

    pub fn audit(&self) -> &AuditLog {
        self.cache.audit()
    }

    /// Prove `statement` using the configured hash function.
    pub fn generate_proof(&self, statement: Statement) -> Result<ZkProof> {
        self.generate_proof_with_hash(statement, self.config.default_hash)
    }

    /// Prove `statement`, deriving Fiat–Shamir challenges with `hash`.
    ///
    /// Malformed statements fail here, before anything is produced.
    pub fn generate_proof_with_hash(
        &self,
        statement: Statement,
        hash: HashFunction,
    ) -> Result<ZkProof> {
        let level = self.config.security_level;
        if level == 0 || level > MAX_SECURITY_LEVEL {
            return Err(ZkError::MalformedStatement(format!(
                "security level {level} is not supported by the group"
            )));
        }
        let statement_type = statement.statement_type();
        let now = now_millis();
        let mut metadata = ProofMetadata {
            statement: statement_type,
            curve: Group::Ristretto255,
            hash,
            transform: TransformKind::FiatShamir,
            generators: vec![G.to_string(), H.to_string()],
            security_level: level,
            created_at: now,
            expires_at: now.saturating_add(duration_millis(self.config.proof_ttl)),
        };

        let body = match statement {
            Statement::DiscreteLog {
                secret,
                group,
                message,
                challenge,
            } => {
                if secret == Scalar::ZERO {
                    return Err(ZkError::MalformedStatement("secret must be non-zero".into()));
                }
                if challenge == Some(Scalar::ZERO) {
                    return Err(ZkError::MalformedStatement(
                        "challenge must be non-zero".into(),
                    ));
                }
                metadata.curve = group;
                metadata.generators = vec![base_label(group).to_string()];
                if challenge.is_some() {
                    metadata.transform = TransformKind::Interactive;
                }
                ProofBody::Schnorr(SchnorrProof::prove(&secret, &message, challenge, &metadata)?)
            }
            Statement::Existence { attribute } => {
                if attribute.is_empty() {
                    return Err(ZkError::MalformedStatement("attribute is empty".into()));
                }
                ProofBody::Pedersen(PedersenProof::prove(
                    &self.params,
                    &attribute_scalar(&attribute),
                    PedersenPredicate::Opening,
                    &metadata,
                )?)
            }
            Statement::Range { value, range } => {
                if value >= range {
                    return Err(ZkError::OutOfRange { value, range });
                }
                ProofBody::Pedersen(PedersenProof::prove(
                    &self.params,
                    &Scalar::from(value),
                    PedersenPredicate::Range { range },
                    &metadata,
                )?)
            }
            Statement::Membership { value, set } => {
                if set.is_empty() {
                    return Err(ZkError::MalformedStatement("membership set is empty".into()));
                }
                if set.len() > MAX_MEMBERSHIP_SET {
                    return Err(ZkError::MalformedStatement(format!(
                        "membership set exceeds {MAX_MEMBERSHIP_SET} entries"
                    )));
                }
                if !set.contains(&value) {
                    return Err(ZkError::NotAMember);
                }
                ProofBody::Pedersen(PedersenProof::prove(
                    &self.params,
                    &attribute_scalar(value.as_bytes()),
                    PedersenPredicate::Membership { set },
                    &metadata,
                )?)
            }
            Statement::Linear {
                witnesses,
                generators,
            } => {
                check_linear_generators(&generators)
                    .map_err(|reason| ZkError::MalformedStatement(reason.into()))?;
                if witnesses.iter().all(|x| *x == Scalar::ZERO) {
                    return Err(ZkError::MalformedStatement(
                        "at least one witness must be non-zero".into(),
                    ));
                }
                metadata.generators = generators;
                ProofBody::Sigma(SigmaProof::prove(&self.params, &witnesses, &metadata)?)
            }
        };

        let proof = ZkProof::seal(body, metadata)?;
        debug!(id = %proof.id, statement = %statement_type, "generated proof");
        self.cache.audit().record(
            events::GENERATED,
            json!({ "id": proof.id.to_hex(), "statement": statement_type, "hash": hash }),
            None,
        );
        self.cache.insert(proof.clone(), now);
        Ok(proof)
    }

    /// Non-interactive Schnorr proof over Ristretto255, or an interactive
    /// one when `challenge` is supplied.
    pub fn generate_schnorr_proof(
        &self,
        secret: Scalar,
        message: &[u8],
        challenge: Option<Scalar>,
    ) -> Result<ZkProof> {
        self.generate_proof(Statement::DiscreteLog {
            secret,
            group: Group::Ristretto255,
            message: message.to_vec(),
            challenge,
        })
    }

    /// Prove knowledge of the Ed25519 secret behind `keypair`, bound to `message`.
    pub fn generate_key_ownership_proof(&self, keypair: &Keypair, message: &[u8]) -> Result<ZkProof> {
        self.generate_proof(Statement::DiscreteLog {
            secret: ed25519_secret_scalar(&keypair.seed()),
            group: Group::Ed25519,
            message: message.to_vec(),
            challenge: None,
        })
    }

    pub fn generate_existence_proof(&self, attribute: &[u8]) -> Result<ZkProof> {
        self.generate_proof(Statement::Existence {
            attribute: attribute.to_vec(),
        })
    }

    /// Fails with [`ZkError::OutOfRange`] unless `0 <= value < range`.
    pub fn generate_range_proof(&self, value: u64, range: u64) -> Result<ZkProof> {
        self.generate_proof(Statement::Range { value, range })
    }

    /// Fails with [`ZkError::NotAMember`] if `value` is absent from `set`.
    pub fn generate_membership_proof(&self, value: &str, set: &[String]) -> Result<ZkProof> {
        self.generate_proof(Statement::Membership {
            value: value.to_string(),
            set: set.to_vec(),
        })
    }

    pub fn generate_linear_proof(
        &self,
        witnesses: Vec<Scalar>,
        generators: Vec<String>,
    ) -> Result<ZkProof> {
        self.generate_proof(Statement::Linear {
            witnesses,
            generators,
        })
    }

    /// Whether `proof` is valid now. Never errors.
    pub fn verify_proof(&self, proof: &ZkProof) -> bool {
        self.verify_proof_at(proof, now_millis())
    }

    pub fn verify_proof_at(&self, proof: &ZkProof, now: i64) -> bool {
        match self.check(proof, now) {
            Ok(()) => true,
            Err(reason) => {
                debug!(id = %proof.id, reason, "proof rejected");
                self.cache.audit().record(
                    events::VERIFY_FAILED,
                    json!({ "id": proof.id.to_hex(), "reason": reason }),
                    None,
                );
                false
            }
        }
    }

    /// Verify an interactive Schnorr transcript against the challenge this
    /// verifier issued.
    pub fn verify_interactive(&self, proof: &ZkProof, challenge: &Scalar) -> bool {
        let ProofBody::Schnorr(body) = &proof.body else {
            return false;
        };
        proof.metadata.transform == TransformKind::Interactive
            && body.challenge.to_scalar().as_ref() == Some(challenge)
            && self.verify_proof(proof)
    }

    fn check(&self, proof: &ZkProof, now: i64) -> std::result::Result<(), &'static str> {
        let meta = &proof.metadata;
        if !proof.id_matches() {
            return Err("id does not match content");
        }
        if meta.created_at > meta.expires_at {
            return Err("validity window is inverted");
        }
        if proof.is_expired(now) {
            return Err("expired");
        }
        if meta.security_level == 0 || meta.security_level > MAX_SECURITY_LEVEL {
            return Err("unsupported security level");
        }
        if proof.body.family() != meta.statement.family() {
            return Err("proof family does not match statement type");
        }
        if meta.statement != StatementType::DiscreteLog {
            if meta.curve != Group::Ristretto255 {
                return Err("curve not valid for statement type");
            }
            if meta.transform != TransformKind::FiatShamir {
                return Err("transform not valid for statement type");
            }
        }

        match meta.statement {
            StatementType::DiscreteLog => {
                if meta.generators != [base_label(meta.curve)] {
                    return Err("unexpected generators");
                }
            }
            StatementType::Existence | StatementType::Range | StatementType::Membership => {
                if meta.generators != [G, H] {
                    return Err("unexpected generators");
                }
            }
            StatementType::Linear => check_linear_generators(&meta.generators)?,
        }

        let holds = match &proof.body {
            ProofBody::Schnorr(body) => body.verify(meta),
            ProofBody::Pedersen(body) => body.verify(&self.params, meta),
            ProofBody::Sigma(body) => body.verify(&self.params, meta),
        };
        if holds {
            Ok(())
        } else {
            Err("relation does not hold")
        }
    }

    /// A cached proof by id.
    pub fn cached(&self, id: &ProofId) -> Option<ZkProof> {
        self.cache.get(id, now_millis())
    }

    pub fn stats(&self) -> ProofCacheStats {
        self.cache.stats(now_millis())
    }

    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired(now_millis())
    }
}

impl Default for ProofEngine {
    fn default() -> Self {
        Self::new(ProofEngineConfig::default())
    }
}

fn base_label(group: Group) -> &'static str {
    match group {
        Group::Ristretto255 => G,
        Group::Ed25519 => B,
    }
}

fn check_linear_generators(labels: &[String]) -> std::result::Result<(), &'static str> {
    if labels.is_empty() {
        return Err("linear relation has no terms");
    }
    if labels.len() > MAX_LINEAR_TERMS {
        return Err("linear relation has too many terms");
    }
    if labels.iter().any(|l| l.is_empty() || l.len() > 64) {
        return Err("generator label must be 1-64 bytes");
    }
    let unique: HashSet<&str> = labels.iter().map(String::as_str).collect();
    if unique.len() != labels.len() {
        return Err("generator labels must be distinct");
    }
    Ok(())
}
