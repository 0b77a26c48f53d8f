//! Challenges, sessions and the signature envelope.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

use keystone_core::Keypair;

use crate::error::AuthError;

/// Capabilities granted to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Sync,
}

impl Permission {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Sync => "sync",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending challenge. At most one per identifier.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub did: String,
    /// Hex-encoded random nonce the holder must sign.
    pub nonce: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl Challenge {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Challenge")
            .field("did", &self.did)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Trust established by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub did: String,
    pub authenticated_at: i64,
    pub expires_at: i64,
    pub device_id: String,
    pub permissions: Vec<Permission>,
}

impl Session {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// What a holder sends back: the nonce and a hex Ed25519 signature over it.
///
/// On the wire the envelope is base64url (unpadded) JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEnvelope {
    pub nonce: String,
    pub signature: String,
}

impl SignatureEnvelope {
    /// Sign a challenge nonce.
    pub fn sign(keypair: &Keypair, nonce: &str) -> Self {
        Self {
            nonce: nonce.to_string(),
            signature: keypair.sign(nonce.as_bytes()).to_hex(),
        }
    }

    pub fn encode(&self) -> Result<String, AuthError> {
        let json =
            serde_json::to_vec(self).map_err(|e| AuthError::InvalidEnvelope(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    pub fn decode(s: &str) -> Result<Self, AuthError> {
        let json = URL_SAFE_NO_PAD
            .decode(s.trim())
            .map_err(|e| AuthError::InvalidEnvelope(e.to_string()))?;
        let envelope: Self =
            serde_json::from_slice(&json).map_err(|e| AuthError::InvalidEnvelope(e.to_string()))?;
        if envelope.nonce.is_empty() || envelope.signature.is_empty() {
            return Err(AuthError::InvalidEnvelope("empty field".into()));
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wire_format() {
        let kp = Keypair::from_seed(&[9u8; 32]);
        let envelope = SignatureEnvelope::sign(&kp, "abcd");
        let wire = envelope.encode().unwrap();
        assert!(!wire.contains('='));
        assert_eq!(SignatureEnvelope::decode(&wire).unwrap(), envelope);
    }

    #[test]
    fn test_envelope_rejects_garbage() {
        assert!(SignatureEnvelope::decode("!!!").is_err());
        assert!(SignatureEnvelope::decode(&URL_SAFE_NO_PAD.encode(b"{}")).is_err());
        let empty = URL_SAFE_NO_PAD.encode(br#"{"nonce":"","signature":"00"}"#);
        assert!(SignatureEnvelope::decode(&empty).is_err());
    }

    #[test]
    fn test_permissions_serialize_lowercase() {
        let json = serde_json::to_string(&vec![Permission::Read, Permission::Sync]).unwrap();
        assert_eq!(json, r#"["read","sync"]"#);
    }

    #[test]
    fn test_challenge_debug_hides_nonce() {
        let c = Challenge {
            did: "did:example:a".into(),
            nonce: "deadbeef".into(),
            issued_at: 0,
            expires_at: 1,
        };
        assert!(!format!("{c:?}").contains("deadbeef"));
    }

    proptest::proptest! {
        #[test]
        fn prop_decode_never_panics(input in ".{0,200}") {
            let _ = SignatureEnvelope::decode(&input);
        }

        #[test]
        fn prop_signed_envelopes_round_trip(seed in proptest::prelude::any::<[u8; 32]>(), nonce in "[0-9a-f]{64,128}") {
            let kp = Keypair::from_seed(&seed);
            let envelope = SignatureEnvelope::sign(&kp, &nonce);
            let decoded = SignatureEnvelope::decode(&envelope.encode().unwrap()).unwrap();
            proptest::prop_assert_eq!(&decoded.nonce, &nonce);
            let signature = keystone_core::Ed25519Signature::from_hex(&decoded.signature).unwrap();
            proptest::prop_assert!(kp.public_key().verify(nonce.as_bytes(), &signature).is_ok());
        }
    }
}
