//! Fiat–Shamir transcripts.
//!
//! A transcript collects labelled values, encodes them as one canonical
//! CBOR map and hashes the bytes to a 64-byte digest reduced mod ℓ.
//! Labels are map keys, so absorption order does not matter but a label
//! may only be used once.

use ciborium::value::Value;
use curve25519_dalek::Scalar;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::canonical;
use crate::encoding::PointBytes;
use crate::error::Result;

const DOMAIN: &str = "keystone zk transcript v1";

/// Hash used to derive challenges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashFunction {
    Blake3,
    Sha256,
}

impl HashFunction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HashFunction::Blake3 => "blake3",
            HashFunction::Sha256 => "sha256",
        }
    }

    /// 64 uniformly distributed bytes.
    fn wide(&self, bytes: &[u8]) -> [u8; 64] {
        let mut out = [0u8; 64];
        match self {
            HashFunction::Blake3 => {
                let mut hasher = blake3::Hasher::new_derive_key(DOMAIN);
                hasher.update(bytes);
                hasher.finalize_xof().fill(&mut out);
            }
            HashFunction::Sha256 => {
                for (i, half) in out.chunks_mut(32).enumerate() {
                    let mut hasher = Sha256::new();
                    hasher.update(DOMAIN.as_bytes());
                    hasher.update([i as u8]);
                    hasher.update(bytes);
                    half.copy_from_slice(&hasher.finalize());
                }
            }
        }
        out
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the challenge was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Supplied by a live verifier.
    Interactive,
    /// Derived from the transcript hash.
    FiatShamir,
}

impl TransformKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransformKind::Interactive => "interactive",
            TransformKind::FiatShamir => "fiat_shamir",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transcript {
    hash: HashFunction,
    entries: Vec<(Value, Value)>,
}

impl Transcript {
    pub fn new(hash: HashFunction) -> Self {
        Self {
            hash,
            entries: Vec::new(),
        }
    }

    pub fn append_text(&mut self, label: &str, text: &str) -> &mut Self {
        self.push(label, Value::Text(text.to_string()))
    }

    pub fn append_bytes(&mut self, label: &str, bytes: &[u8]) -> &mut Self {
        self.push(label, Value::Bytes(bytes.to_vec()))
    }

    pub fn append_u64(&mut self, label: &str, n: u64) -> &mut Self {
        self.push(label, Value::Integer(n.into()))
    }

    pub fn append_i64(&mut self, label: &str, n: i64) -> &mut Self {
        self.push(label, Value::Integer(n.into()))
    }

    pub fn append_point(&mut self, label: &str, point: &PointBytes) -> &mut Self {
        self.append_bytes(label, &point.0)
    }

    pub fn append_texts(&mut self, label: &str, items: &[String]) -> &mut Self {
        let items = items.iter().map(|s| Value::Text(s.clone())).collect();
        self.push(label, Value::Array(items))
    }

    pub fn append_points(&mut self, label: &str, points: &[PointBytes]) -> &mut Self {
        let items = points.iter().map(|p| Value::Bytes(p.0.to_vec())).collect();
        self.push(label, Value::Array(items))
    }

    fn push(&mut self, label: &str, value: Value) -> &mut Self {
        self.entries.push((Value::Text(label.to_string()), value));
        self
    }

    /// The canonical bytes that get hashed.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut entries = self.entries.clone();
        entries.push((
            Value::Text("hash".into()),
            Value::Text(self.hash.as_str().into()),
        ));
        canonical::encode(&Value::Map(entries))
    }

    pub fn challenge(&self) -> Result<Scalar> {
        let bytes = self.to_bytes()?;
        Ok(Scalar::from_bytes_mod_order_wide(&self.hash.wide(&bytes)))
    }
}
