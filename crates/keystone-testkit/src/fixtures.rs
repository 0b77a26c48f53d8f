//! Test fixtures and helpers.

use std::sync::Arc;
use std::time::Duration;

use keystone::{AuthConfig, Keystone, KeystoneConfig, SignatureEnvelope};
use keystone_core::{Did, DidDocument, Ed25519PublicKey, Keypair};
use keystone_store::{KeyValueStore, MemoryStore};

/// A holder: keypair, `did:key` identifier and its implied document.
pub struct TestIdentity {
    pub keypair: Keypair,
    pub did: Did,
    pub document: DidDocument,
}

impl TestIdentity {
    /// A fresh random identity.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// A deterministic identity.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::from_keypair(Keypair::from_seed(&seed))
    }

    fn from_keypair(keypair: Keypair) -> Self {
        // `did:key` strings built from a valid key always parse.
        let did = Did::parse(&keypair.did_key()).unwrap_or_else(|e| panic!("did:key: {e}"));
        let document = DidDocument::for_did_key(&did, keypair.public_key());
        Self {
            keypair,
            did,
            document,
        }
    }

    pub fn did_str(&self) -> &str {
        self.did.as_str()
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    /// Encoded envelope answering a challenge nonce.
    pub fn sign_challenge(&self, nonce: &str) -> String {
        SignatureEnvelope::sign(&self.keypair, nonce)
            .encode()
            .unwrap_or_else(|e| panic!("envelope: {e}"))
    }
}

impl Default for TestIdentity {
    fn default() -> Self {
        Self::new()
    }
}

/// Identities with distinct deterministic seeds.
pub fn identities(count: u8) -> Vec<TestIdentity> {
    (0..count).map(|i| TestIdentity::with_seed([i + 1; 32])).collect()
}

/// A local-only context over `store` with test-friendly timings.
pub fn keystone_with_store(store: Arc<dyn KeyValueStore>) -> Keystone {
    let config = KeystoneConfig {
        auth: AuthConfig {
            failure_delay: Duration::from_millis(1),
            ..Default::default()
        },
        ..Default::default()
    };
    Keystone::builder().config(config).store(store).build_local()
}

/// [`keystone_with_store`] over a fresh [`MemoryStore`].
pub fn test_keystone() -> Keystone {
    keystone_with_store(Arc::new(MemoryStore::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_identity_is_deterministic() {
        let a = TestIdentity::with_seed([5; 32]);
        let b = TestIdentity::with_seed([5; 32]);
        assert_eq!(a.did, b.did);
        assert_eq!(a.document.verification_method, b.document.verification_method);
    }

    #[test]
    fn test_identities_distinct() {
        let ids = identities(4);
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a.did, b.did);
            }
        }
    }

    #[tokio::test]
    async fn test_identity_authenticates() {
        let keystone = test_keystone();
        let alice = TestIdentity::new();
        let challenge = keystone
            .create_challenge(alice.did_str(), None)
            .await
            .unwrap();
        let session = keystone
            .authenticate(alice.did_str(), &alice.sign_challenge(&challenge.nonce))
            .await;
        assert!(session.is_some());
    }
}
