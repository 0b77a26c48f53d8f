//! Cryptographic primitives for Keystone.
//!
//! Wraps Ed25519 signing with strong types, plus the two key encodings a DID
//! document may carry: multibase (`z` + base58btc of the `ed25519-pub`
//! multicodec) and JWK (`OKP` / `Ed25519`).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

use crate::document::Jwk;
use crate::error::{CoreError, Result};

/// Multicodec prefix for an Ed25519 public key (varint of 0xed).
pub const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// Multibase prefix for base58btc.
pub const MULTIBASE_BASE58BTC: char = 'z';

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Encode as multibase base58btc with the Ed25519 multicodec prefix.
    ///
    /// This is the string that follows `did:key:`.
    pub fn to_multibase(&self) -> String {
        let mut buf = Vec::with_capacity(34);
        buf.extend_from_slice(&ED25519_MULTICODEC);
        buf.extend_from_slice(&self.0);
        format!("{}{}", MULTIBASE_BASE58BTC, bs58::encode(buf).into_string())
    }

    /// Decode a multibase key.
    ///
    /// Accepts the multicodec-prefixed form (34 bytes) and the bare 32-byte
    /// form some documents publish.
    pub fn from_multibase(s: &str) -> Result<Self> {
        let encoded = s.strip_prefix(MULTIBASE_BASE58BTC).ok_or_else(|| {
            CoreError::DecodingError("multibase key must use base58btc ('z')".into())
        })?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| CoreError::DecodingError(format!("base58: {e}")))?;

        let raw = match bytes.len() {
            34 if bytes[..2] == ED25519_MULTICODEC => &bytes[2..],
            34 => {
                return Err(CoreError::UnsupportedKeyType(format!(
                    "multicodec 0x{:02x}{:02x}",
                    bytes[0], bytes[1]
                )))
            }
            32 => &bytes[..],
            n => {
                return Err(CoreError::DecodingError(format!(
                    "multibase key has {n} bytes"
                )))
            }
        };

        let mut arr = [0u8; 32];
        arr.copy_from_slice(raw);
        Ok(Self(arr))
    }

    /// Export as an `OKP` JWK.
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "OKP".into(),
            crv: "Ed25519".into(),
            x: URL_SAFE_NO_PAD.encode(self.0),
            kid: None,
        }
    }

    /// Import from an `OKP` / `Ed25519` JWK.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        if jwk.kty != "OKP" || jwk.crv != "Ed25519" {
            return Err(CoreError::UnsupportedKeyType(format!(
                "{}/{}",
                jwk.kty, jwk.crv
            )));
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(jwk.x.trim_end_matches('='))
            .map_err(|e| CoreError::DecodingError(format!("jwk x: {e}")))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::InvalidPublicKey)?;
        Ok(Self(arr))
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<()> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;

        let sig = Signature::from_bytes(&signature.0);

        verifying_key
            .verify_strict(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Ed25519PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Ed25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Ed25519Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::DecodingError(e.to_string()))?;
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Ed25519Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 64]> for Ed25519Signature {
    fn from(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Ed25519Signature {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self> {
        let arr: [u8; 64] = slice.try_into().map_err(|_| {
            CoreError::DecodingError(format!("signature has {} bytes, expected 64", slice.len()))
        })?;
        Ok(Self(arr))
    }
}

/// An Ed25519 keypair held by a DID controller.
///
/// This wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Get the public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        let sig = self.signing_key.sign(message);
        Ed25519Signature(sig.to_bytes())
    }

    /// Get the raw seed bytes (secret key material).
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The `did:key` identifier string for this keypair.
    pub fn did_key(&self) -> String {
        format!("did:key:{}", self.public_key().to_multibase())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

/// Fill a fresh buffer from the operating system CSPRNG.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Compare two strings without an early exit on the first differing byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
