//! Proof wire types.
//!
//! A [`ZkProof`] is immutable once sealed. Its id is the Blake3 hash of
//! the canonical CBOR encoding of `(body, metadata)`, so any edit to either
//! part is detected before the relation is even checked.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::canonical;
use crate::curve::Group;
use crate::error::{Result, ZkError};
use crate::pedersen::PedersenProof;
use crate::schnorr::SchnorrProof;
use crate::sigma::SigmaProof;
use crate::statement::{ProofFamily, StatementType};
use crate::transcript::{HashFunction, TransformKind, Transcript};

/// Content hash identifying a proof.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProofId(pub [u8; 32]);

impl ProofId {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }
}

impl fmt::Debug for ProofId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ProofId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ProofId {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ProofId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Everything a verifier needs besides the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofMetadata {
    pub statement: StatementType,
    pub curve: Group,
    pub hash: HashFunction,
    pub transform: TransformKind,
    /// Labels of the generators the relation uses, in order.
    pub generators: Vec<String>,
    pub security_level: u32,
    pub created_at: i64,
    pub expires_at: i64,
}

impl ProofMetadata {
    /// A transcript with every metadata field absorbed.
    pub(crate) fn transcript(&self) -> Transcript {
        let mut t = Transcript::new(self.hash);
        t.append_text("statement", self.statement.as_str())
            .append_text("curve", self.curve.as_str())
            .append_text("transform", self.transform.as_str())
            .append_texts("generators", &self.generators)
            .append_u64("security", u64::from(self.security_level))
            .append_i64("created", self.created_at)
            .append_i64("expires", self.expires_at);
        t
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// The family-specific part of a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ProofBody {
    Schnorr(SchnorrProof),
    Pedersen(PedersenProof),
    Sigma(SigmaProof),
}

impl ProofBody {
    pub fn family(&self) -> ProofFamily {
        match self {
            ProofBody::Schnorr(_) => ProofFamily::Schnorr,
            ProofBody::Pedersen(_) => ProofFamily::Pedersen,
            ProofBody::Sigma(_) => ProofFamily::Sigma,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkProof {
    pub id: ProofId,
    pub body: ProofBody,
    pub metadata: ProofMetadata,
}

impl ZkProof {
    /// Hash the canonical encoding of body and metadata.
    pub fn compute_id(body: &ProofBody, metadata: &ProofMetadata) -> Result<ProofId> {
        let bytes = canonical::to_canonical_bytes(&(body, metadata))?;
        Ok(ProofId(*blake3::hash(&bytes).as_bytes()))
    }

    pub fn seal(body: ProofBody, metadata: ProofMetadata) -> Result<Self> {
        let id = Self::compute_id(&body, &metadata)?;
        Ok(Self { id, body, metadata })
    }

    /// Whether the stored id matches the content.
    pub fn id_matches(&self) -> bool {
        matches!(Self::compute_id(&self.body, &self.metadata), Ok(id) if id == self.id)
    }

    pub fn statement_type(&self) -> StatementType {
        self.metadata.statement
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.metadata.is_expired(now)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ZkError::Encoding(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| ZkError::Encoding(e.to_string()))
    }
}
