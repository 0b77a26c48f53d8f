//! Proptest generators for property-based testing.

use proptest::prelude::*;

use keystone_core::{Did, DidDocument, Keypair, MAX_DID_LENGTH};
use keystone_zkp::{ed25519_secret_scalar, Group, Scalar, Statement};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// A valid `did:key` identifier.
pub fn did_key() -> impl Strategy<Value = String> {
    keypair().prop_map(|kp| kp.did_key())
}

fn dns_label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,9}(-[a-z0-9]{1,5})?"
}

/// A valid `did:web` identifier, optionally with a port and path.
pub fn did_web() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(dns_label(), 1..3),
        "[a-z]{2,6}",
        prop::option::of(1u16..),
        prop::collection::vec("[a-z0-9_-]{1,8}", 0..3),
    )
        .prop_map(|(labels, tld, port, path)| {
            let mut did = format!("did:web:{}.{tld}", labels.join("."));
            if let Some(port) = port {
                did.push_str(&format!("%3A{port}"));
            }
            for segment in path {
                did.push(':');
                did.push_str(&segment);
            }
            did
        })
        .prop_filter("fits length limit", |d| d.len() <= MAX_DID_LENGTH)
        .prop_filter("no scheme-like segment", |d| !has_scheme_segment(d))
}

// Labels such as `data` followed by `:` trip the injection blocklist.
fn has_scheme_segment(did: &str) -> bool {
    ["javascript:", "vbscript:", "data:", "file:"]
        .iter()
        .any(|p| did[4..].contains(p))
}

/// A valid `did:ethr` identifier, optionally with a named network.
pub fn did_ethr() -> impl Strategy<Value = String> {
    (
        prop::option::of(prop_oneof![
            Just("mainnet".to_string()),
            Just("sepolia".to_string()),
            Just("0x89".to_string()),
        ]),
        any::<[u8; 20]>(),
    )
        .prop_map(|(network, address)| match network {
            Some(n) => format!("did:ethr:{n}:0x{}", hex::encode(address)),
            None => format!("did:ethr:0x{}", hex::encode(address)),
        })
}

/// A well-formed identifier with a method that has no specific checks.
pub fn did_other() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9]{1,8}", "[A-Za-z0-9._-]{1,40}")
        .prop_filter("method must be unknown", |(m, _)| {
            !matches!(m.as_str(), "key" | "web" | "ethr")
        })
        .prop_filter("no dot segments", |(_, id)| !id.contains(".."))
        .prop_map(|(method, id)| format!("did:{method}:{id}"))
        .prop_filter("no scheme-like segment", |d| !has_scheme_segment(d))
}

/// Any valid identifier.
pub fn valid_did() -> impl Strategy<Value = String> {
    prop_oneof![did_key(), did_web(), did_ethr(), did_other()]
}

/// Strings that violate the identifier grammar.
pub fn invalid_did() -> impl Strategy<Value = String> {
    prop_oneof![
        // Wrong scheme
        "[a-ce-z]{2,4}:[a-z]{2,5}:[a-z0-9]{1,10}",
        // Uppercase method
        "did:[A-Z]{2,5}:[a-z0-9]{1,10}",
        // Missing identifier part
        "did:[a-z]{2,5}:?",
        // Forbidden characters
        "did:[a-z]{2,5}:[a-z]{1,5}[ <>\"'{}|^`][a-z]{1,5}",
        // Injection payloads
        prop_oneof![
            Just("javascript:alert(1)".to_string()),
            Just("did:web:example.com:..%2F..%2Fetc".to_string()),
            Just("did:example:<script>".to_string()),
            Just("did:example:data:text/html".to_string()),
        ],
        // Oversized
        "[a-z0-9]{101,140}".prop_map(|s| format!("did:example:{s}")),
    ]
}

/// The document a random `did:key` identifier implies.
pub fn did_key_document() -> impl Strategy<Value = DidDocument> {
    keypair().prop_map(|kp| {
        let did = Did::parse(&kp.did_key()).unwrap_or_else(|e| panic!("did:key: {e}"));
        DidDocument::for_did_key(&did, kp.public_key())
    })
}

/// A non-zero scalar.
pub fn scalar() -> impl Strategy<Value = Scalar> {
    any::<[u8; 32]>()
        .prop_map(Scalar::from_bytes_mod_order)
        .prop_filter("non-zero", |s| *s != Scalar::ZERO)
}

/// A statement an honest prover can prove.
pub fn honest_statement() -> impl Strategy<Value = Statement> {
    prop_oneof![
        (scalar(), prop::collection::vec(any::<u8>(), 0..32)).prop_map(|(secret, message)| {
            Statement::DiscreteLog {
                secret,
                group: Group::Ristretto255,
                message,
                challenge: None,
            }
        }),
        (keypair(), prop::collection::vec(any::<u8>(), 0..32)).prop_map(|(kp, message)| {
            Statement::DiscreteLog {
                secret: ed25519_secret_scalar(&kp.seed()),
                group: Group::Ed25519,
                message,
                challenge: None,
            }
        }),
        prop::collection::vec(any::<u8>(), 1..32)
            .prop_map(|attribute| Statement::Existence { attribute }),
        (1u64.., any::<u64>()).prop_map(|(range, seed)| Statement::Range {
            value: seed % range,
            range,
        }),
        (prop::collection::vec("[a-z]{1,8}", 1..8), any::<prop::sample::Index>()).prop_map(
            |(set, index)| Statement::Membership {
                value: index.get(&set).clone(),
                set,
            }
        ),
        prop::collection::vec(scalar(), 1..4).prop_map(|witnesses| {
            let generators = (0..witnesses.len()).map(|i| format!("g{i}")).collect();
            Statement::Linear {
                witnesses,
                generators,
            }
        }),
    ]
}

/// Ranges with a value outside `[0, range)`.
pub fn out_of_range() -> impl Strategy<Value = (u64, u64)> {
    (0u64..u64::MAX, any::<u64>()).prop_map(|(range, extra)| {
        let value = range.saturating_add(extra % (u64::MAX - range));
        (value, range)
    })
}
