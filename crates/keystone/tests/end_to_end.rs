//! End-to-end flows through the public `Keystone` surface.

use std::sync::{Arc, Once};
use std::time::Duration;

use keystone::authenticator::events;
use keystone::{AuthConfig, Keystone, KeystoneConfig, Permission};
use keystone_core::{now_millis, validate_did, Did, DidDocument, ErrorKind, VerificationMethod};
use keystone_resolver::{MemoryFetcher, ResolverConfig};
use keystone_store::{KeyValueStore, SqliteStore};
use keystone_testkit::fixtures::{test_keystone, TestIdentity};
use keystone_testkit::vectors::verify_did_vectors;
use keystone_zkp::{ProofBody, Scalar, Statement, ZkError};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn quick_config() -> KeystoneConfig {
    KeystoneConfig {
        auth: AuthConfig {
            failure_delay: Duration::from_millis(1),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A `did:web` document controlled by `holder`'s key.
fn web_document(did: &str, holder: &TestIdentity) -> DidDocument {
    let did = Did::parse(did).unwrap();
    let vm_id = did.with_fragment("owner");
    let mut document = DidDocument::new(&did);
    document.verification_method.push(VerificationMethod {
        id: vm_id.clone(),
        type_: "Ed25519VerificationKey2020".into(),
        controller: did.to_string(),
        public_key_multibase: Some(holder.public_key().to_multibase()),
        public_key_jwk: None,
    });
    document.authentication.push(vm_id);
    document
}

#[test]
fn test_identifier_validation_vectors() {
    for (name, passed) in verify_did_vectors() {
        assert!(passed, "vector '{name}'");
    }
}

#[tokio::test]
async fn test_invalid_identifier_is_rejected_everywhere() {
    init_tracing();
    let keystone = test_keystone();
    let bad = "did:example:<script>";
    assert!(!validate_did(bad).valid);

    let err = keystone.resolve(bad).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    let err = keystone.create_challenge(bad, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    assert!(keystone.authenticate(bad, "e30").await.is_none());
}

#[tokio::test]
async fn test_did_key_login_flow() {
    init_tracing();
    let keystone = test_keystone();
    let alice = TestIdentity::new();

    let document = keystone.resolve(alice.did_str()).await.unwrap();
    assert_eq!(document.id, alice.did_str());
    assert_eq!(
        document.verification_method[0].id,
        format!("{}#key-1", alice.did_str())
    );

    let challenge = keystone.create_challenge(alice.did_str(), None).await.unwrap();
    assert!(challenge.nonce.len() >= 64);

    let before = now_millis();
    let session = keystone
        .authenticate(alice.did_str(), &alice.sign_challenge(&challenge.nonce))
        .await
        .expect("valid signature authenticates");

    assert_eq!(session.did, alice.did_str());
    assert_eq!(
        session.permissions,
        vec![Permission::Read, Permission::Write, Permission::Sync]
    );
    let day = 24 * 60 * 60 * 1000;
    assert_eq!(session.expires_at - session.authenticated_at, day);
    assert!(session.authenticated_at >= before);
    assert!(session.authenticated_at <= now_millis());
    assert!(!session.device_id.is_empty());
    assert!(keystone.is_authenticated(alice.did_str()).await);

    keystone.logout(alice.did_str()).await.unwrap();
    assert!(!keystone.is_authenticated(alice.did_str()).await);
    // Logging out twice is fine.
    keystone.logout(alice.did_str()).await.unwrap();
}

#[tokio::test]
async fn test_challenge_is_single_use() {
    init_tracing();
    let keystone = test_keystone();
    let alice = TestIdentity::new();

    let challenge = keystone.create_challenge(alice.did_str(), None).await.unwrap();
    let envelope = alice.sign_challenge(&challenge.nonce);

    assert!(keystone.authenticate(alice.did_str(), &envelope).await.is_some());
    assert!(keystone.authenticate(alice.did_str(), &envelope).await.is_none());

    let failures = keystone.authenticator().audit().filter(events::FAILED);
    assert_eq!(failures.len(), 1);
}

#[tokio::test]
async fn test_new_challenge_replaces_pending_one() {
    init_tracing();
    let keystone = test_keystone();
    let alice = TestIdentity::new();

    let first = keystone.create_challenge(alice.did_str(), None).await.unwrap();
    let second = keystone.create_challenge(alice.did_str(), None).await.unwrap();
    assert_ne!(first.nonce, second.nonce);

    assert!(keystone
        .authenticate(alice.did_str(), &alice.sign_challenge(&first.nonce))
        .await
        .is_none());
}

#[tokio::test]
async fn test_wrong_key_fails() {
    init_tracing();
    let keystone = test_keystone();
    let alice = TestIdentity::new();
    let mallory = TestIdentity::new();

    let challenge = keystone.create_challenge(alice.did_str(), None).await.unwrap();
    let forged = mallory.sign_challenge(&challenge.nonce);
    assert!(keystone.authenticate(alice.did_str(), &forged).await.is_none());
    assert!(!keystone.is_authenticated(alice.did_str()).await);
}

#[tokio::test]
async fn test_challenge_expiry_boundary() {
    init_tracing();
    let keystone = test_keystone();
    let alice = TestIdentity::new();

    let stale = keystone
        .create_challenge(alice.did_str(), Some(Duration::from_millis(1)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(keystone
        .authenticate(alice.did_str(), &alice.sign_challenge(&stale.nonce))
        .await
        .is_none());

    let fresh = keystone
        .create_challenge(alice.did_str(), Some(Duration::from_secs(60)))
        .await
        .unwrap();
    assert!(keystone
        .authenticate(alice.did_str(), &alice.sign_challenge(&fresh.nonce))
        .await
        .is_some());
}

#[tokio::test]
async fn test_challenge_rate_limit() {
    init_tracing();
    let keystone = test_keystone();
    let alice = TestIdentity::new();

    for _ in 0..5 {
        keystone.create_challenge(alice.did_str(), None).await.unwrap();
    }
    let err = keystone.create_challenge(alice.did_str(), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);

    // Limits are per identifier.
    let bob = TestIdentity::new();
    keystone.create_challenge(bob.did_str(), None).await.unwrap();
}

#[tokio::test]
async fn test_publish_then_resolve_did_web() {
    init_tracing();
    let keystone = test_keystone();
    let holder = TestIdentity::new();
    let did = "did:web:example.com:users:alice";

    assert_eq!(
        keystone.resolve(did).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    let document = web_document(did, &holder);
    keystone.publish(&document).await.unwrap();
    let resolved = keystone.resolve(did).await.unwrap();
    assert_eq!(resolved.verification_method, document.verification_method);

    let challenge = keystone.create_challenge(did, None).await.unwrap();
    let session = keystone
        .authenticate(did, &holder.sign_challenge(&challenge.nonce))
        .await
        .unwrap();
    assert_eq!(session.did, did);
}

#[tokio::test]
async fn test_publish_rejects_invalid_document() {
    init_tracing();
    let keystone = test_keystone();
    let did = Did::parse("did:web:example.com").unwrap();
    let empty = DidDocument::new(&did);
    let err = keystone.publish(&empty).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFormat);
}

#[tokio::test]
async fn test_remote_resolution_is_cached() {
    init_tracing();
    let fetcher = MemoryFetcher::new();
    let holder = TestIdentity::new();
    let did = "did:web:example.org";
    let url = "https://example.org/.well-known/did.json";
    let document = web_document(did, &holder);
    fetcher.serve(url, document.to_json().unwrap()).await;

    let keystone = Keystone::builder()
        .config(quick_config())
        .fetcher(fetcher.clone())
        .build()
        .unwrap();

    let first = keystone.resolve(did).await.unwrap();
    let second = keystone.resolve(did).await.unwrap();
    assert_eq!(first, second);

    let hits = fetcher
        .requests()
        .await
        .into_iter()
        .filter(|u| u == url)
        .count();
    assert_eq!(hits, 1, "second resolution must come from cache");
    assert_eq!(keystone.resolver().cache_stats().entries, 1);
}

#[tokio::test]
async fn test_remote_document_with_wrong_id_is_refused() {
    init_tracing();
    let fetcher = MemoryFetcher::new();
    let holder = TestIdentity::new();
    let forged = web_document("did:web:attacker.example", &holder);
    fetcher
        .serve(
            "https://victim.example/.well-known/did.json",
            forged.to_json().unwrap(),
        )
        .await;

    let keystone = Keystone::builder()
        .config(quick_config())
        .fetcher(fetcher)
        .build()
        .unwrap();
    let err = keystone.resolve("did:web:victim.example").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_resolution_rate_limit() {
    init_tracing();
    let mut config = quick_config();
    config.resolver = ResolverConfig {
        rate_limit: keystone_resolver::RateLimitRule::per_minute(2),
        ..Default::default()
    };
    let keystone = Keystone::builder().config(config).build_local();
    let alice = TestIdentity::new();

    keystone.resolve(alice.did_str()).await.unwrap();
    keystone.resolve(alice.did_str()).await.unwrap();
    let err = keystone.resolve(alice.did_str()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);
}

#[tokio::test]
async fn test_zero_knowledge_login() {
    init_tracing();
    let keystone = test_keystone();
    let alice = TestIdentity::new();

    let challenge = keystone.create_challenge(alice.did_str(), None).await.unwrap();
    let proof = keystone
        .proofs()
        .generate_key_ownership_proof(&alice.keypair, challenge.nonce.as_bytes())
        .unwrap();
    let session = keystone
        .authenticate_with_proof(alice.did_str(), &proof)
        .await
        .expect("key ownership proof authenticates");
    assert_eq!(session.did, alice.did_str());
}

#[tokio::test]
async fn test_zero_knowledge_login_rejects_other_key() {
    init_tracing();
    let keystone = test_keystone();
    let alice = TestIdentity::new();
    let mallory = TestIdentity::new();

    let challenge = keystone.create_challenge(alice.did_str(), None).await.unwrap();
    let proof = keystone
        .proofs()
        .generate_key_ownership_proof(&mallory.keypair, challenge.nonce.as_bytes())
        .unwrap();
    assert!(keystone
        .authenticate_with_proof(alice.did_str(), &proof)
        .await
        .is_none());
}

#[test]
fn test_range_proof_rejects_out_of_range() {
    let keystone = test_keystone();
    for (value, range) in [(10, 10), (11, 10), (0, 0), (u64::MAX, 1)] {
        let err = keystone
            .generate_proof(Statement::Range { value, range })
            .unwrap_err();
        assert!(matches!(
            err,
            keystone::KeystoneError::Proof(ZkError::OutOfRange { .. })
        ));
    }
    let proof = keystone
        .generate_proof(Statement::Range { value: 9, range: 10 })
        .unwrap();
    assert!(keystone.verify_proof(&proof));
}

#[test]
fn test_proofs_complete_and_tamper_evident() {
    let keystone = test_keystone();
    let statements = vec![
        Statement::DiscreteLog {
            secret: Scalar::from(42u64),
            group: keystone_zkp::Group::Ristretto255,
            message: b"hello".to_vec(),
            challenge: None,
        },
        Statement::Existence {
            attribute: b"over-18".to_vec(),
        },
        Statement::Membership {
            value: "admin".into(),
            set: vec!["user".into(), "admin".into()],
        },
        Statement::Linear {
            witnesses: vec![Scalar::from(3u64), Scalar::from(5u64)],
            generators: vec!["G".into(), "H".into()],
        },
    ];

    for statement in statements {
        let proof = keystone.generate_proof(statement).unwrap();
        assert!(keystone.verify_proof(&proof));

        // Round trip through JSON keeps the proof valid.
        let restored = keystone_zkp::ZkProof::from_json(&proof.to_json().unwrap()).unwrap();
        assert!(keystone.verify_proof(&restored));

        // Any change to the body breaks it.
        let mut tampered = proof.clone();
        match &mut tampered.body {
            ProofBody::Schnorr(p) => p.message.0.push(0),
            ProofBody::Pedersen(p) => p.response_value = p.response_blinding,
            ProofBody::Sigma(p) => p.responses.reverse(),
        }
        assert!(!keystone.verify_proof(&tampered));

        // So does stretching the validity window.
        let mut extended = proof.clone();
        extended.metadata.expires_at += 1;
        assert!(!keystone.verify_proof(&extended));
    }
}

#[tokio::test]
async fn test_state_survives_restart_with_sqlite() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keystone.db");
    let alice = TestIdentity::new();

    let (nonce, device_id) = {
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&path).unwrap());
        let keystone = Keystone::builder()
            .config(quick_config())
            .store(store)
            .build_local();
        let device_id = keystone.authenticator().device_id().await.unwrap();
        let challenge = keystone.create_challenge(alice.did_str(), None).await.unwrap();
        (challenge.nonce, device_id)
    };

    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&path).unwrap());
    let keystone = Keystone::builder()
        .config(quick_config())
        .store(store)
        .build_local();
    assert_eq!(keystone.authenticator().device_id().await.unwrap(), device_id);

    let session = keystone
        .authenticate(alice.did_str(), &alice.sign_challenge(&nonce))
        .await
        .expect("persisted challenge is honoured after restart");
    assert_eq!(session.device_id, device_id);
    assert!(keystone.is_authenticated(alice.did_str()).await);
}

#[tokio::test]
async fn test_purge_expired_sweeps_components() {
    init_tracing();
    let keystone = test_keystone();
    let alice = TestIdentity::new();
    keystone
        .create_challenge(alice.did_str(), Some(Duration::from_millis(1)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(keystone.purge_expired().await.unwrap() >= 1);
}
