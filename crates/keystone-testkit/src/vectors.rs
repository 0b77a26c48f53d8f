//! Golden test vectors.
//!
//! Identifier verdicts pin the validator's grammar. Key vectors are the
//! RFC 8032 Ed25519 test cases, so `did:key` derivation and signing agree
//! with every other implementation.

use serde::Serialize;

use keystone_core::{validate_did, Keypair};

/// An identifier and whether the validator must accept it.
#[derive(Debug, Clone, Serialize)]
pub struct DidVector {
    pub name: &'static str,
    pub did: String,
    pub valid: bool,
    /// Accepted, but with at least one warning.
    pub warns: bool,
}

/// An Ed25519 seed with its expected public key and signature.
#[derive(Debug, Clone, Serialize)]
pub struct KeyVector {
    pub name: &'static str,
    pub seed_hex: &'static str,
    pub public_key_hex: &'static str,
    pub message_hex: &'static str,
    pub signature_hex: &'static str,
}

pub fn key_vectors() -> Vec<KeyVector> {
    vec![
        KeyVector {
            name: "RFC 8032 test 1",
            seed_hex: "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60",
            public_key_hex: "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a",
            message_hex: "",
            signature_hex: "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b",
        },
        KeyVector {
            name: "RFC 8032 test 2",
            seed_hex: "4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb",
            public_key_hex: "3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c",
            message_hex: "72",
            signature_hex: "92a009a9f0d4cab8720e820b5f642540a2b27b5416503f8fb3762223ebdb69da085ac1e43e15996e458f3613d0f11d8c387b2eaeb4302aeeb00d291612bb0c00",
        },
    ]
}

impl KeyVector {
    pub fn keypair(&self) -> Keypair {
        let mut seed = [0u8; 32];
        hex::decode_to_slice(self.seed_hex, &mut seed)
            .unwrap_or_else(|e| panic!("{}: bad seed hex: {e}", self.name));
        Keypair::from_seed(&seed)
    }

    pub fn message(&self) -> Vec<u8> {
        hex::decode(self.message_hex).unwrap_or_else(|e| panic!("{}: bad message hex: {e}", self.name))
    }
}

pub fn did_vectors() -> Vec<DidVector> {
    let key_did = key_vectors()[0].keypair().did_key();
    let accept = |name, did: &str, warns| DidVector {
        name,
        did: did.to_string(),
        valid: true,
        warns,
    };
    let reject = |name, did: &str| DidVector {
        name,
        did: did.to_string(),
        valid: false,
        warns: false,
    };

    vec![
        accept("did:key from RFC 8032 key", &key_did, false),
        accept("did:web bare host", "did:web:example.com", false),
        accept(
            "did:web with port and path",
            "did:web:example.com%3A8443:users:alice",
            false,
        ),
        accept(
            "did:ethr address",
            "did:ethr:0xb9c5714089478a327f09197987f16f9e5d936e8a",
            false,
        ),
        accept(
            "did:ethr on named network",
            "did:ethr:mainnet:0xb9c5714089478a327f09197987f16f9e5d936e8a",
            false,
        ),
        accept("unknown method", "did:example:123456789abcdefghi", true),
        reject("empty", ""),
        reject("scheme only", "did:"),
        reject("missing identifier", "did:web:"),
        reject("uppercase scheme", "DID:web:example.com"),
        reject("uppercase method", "did:Web:example.com"),
        reject("did:web on IP address", "did:web:127.0.0.1"),
        reject("did:key without multibase prefix", "did:key:abc"),
        reject("script scheme", "javascript:alert(1)"),
        reject("path traversal", "did:web:example.com/../etc"),
        reject("markup", "did:example:<script>"),
        reject("trailing colon", "did:example:abc:"),
        reject("malformed percent-encoding", "did:example:%zz"),
        DidVector {
            name: "over length limit",
            did: format!("did:example:{}", "a".repeat(100)),
            valid: false,
            warns: false,
        },
    ]
}

/// Run every identifier vector, returning `(name, passed)`.
pub fn verify_did_vectors() -> Vec<(&'static str, bool)> {
    did_vectors()
        .into_iter()
        .map(|v| {
            let report = validate_did(&v.did);
            let passed = report.valid == v.valid && (!v.warns || !report.warnings.is_empty());
            (v.name, passed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, VerifyingKey};
    use keystone_core::Ed25519PublicKey;

    #[test]
    fn test_did_vectors() {
        for (name, passed) in verify_did_vectors() {
            assert!(passed, "vector '{name}' disagreed with the validator");
        }
    }

    #[test]
    fn test_rejections_carry_reasons() {
        for v in did_vectors().iter().filter(|v| !v.valid) {
            assert!(!validate_did(&v.did).errors.is_empty(), "{}", v.name);
        }
    }

    #[test]
    fn test_key_vectors_public_keys() {
        for v in key_vectors() {
            assert_eq!(v.keypair().public_key().to_hex(), v.public_key_hex, "{}", v.name);
        }
    }

    #[test]
    fn test_key_vectors_signatures() {
        for v in key_vectors() {
            let signature = v.keypair().sign(&v.message());
            assert_eq!(signature.to_hex(), v.signature_hex, "{}", v.name);
        }
    }

    #[test]
    fn test_key_vectors_verify_with_dalek() {
        for v in key_vectors() {
            let mut pk = [0u8; 32];
            hex::decode_to_slice(v.public_key_hex, &mut pk).unwrap();
            let mut sig = [0u8; 64];
            hex::decode_to_slice(v.signature_hex, &mut sig).unwrap();
            let key = VerifyingKey::from_bytes(&pk).unwrap();
            key.verify_strict(&v.message(), &Signature::from_bytes(&sig))
                .unwrap();
        }
    }

    #[test]
    fn test_did_key_round_trips_to_public_key() {
        let v = &key_vectors()[0];
        let did = v.keypair().did_key();
        let multibase = did.strip_prefix("did:key:").unwrap();
        assert!(multibase.starts_with("z6Mk"));
        let decoded = Ed25519PublicKey::from_multibase(multibase).unwrap();
        assert_eq!(decoded.to_hex(), v.public_key_hex);
    }

    #[test]
    fn test_vectors_serialize() {
        let json = serde_json::to_value(did_vectors()).unwrap();
        assert!(json.as_array().is_some_and(|a| a.len() == did_vectors().len()));
        let json = serde_json::to_value(key_vectors()).unwrap();
        assert_eq!(json[0]["name"], "RFC 8032 test 1");
    }
}
