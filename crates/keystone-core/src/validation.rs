//! DID and DID document validation.
//!
//! Both validators are pure and never fail: they return a report listing
//! every error and warning found. Errors make the input invalid; warnings
//! do not.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::crypto::Ed25519PublicKey;
use crate::did::{DidMethod, DID_SCHEME, MAX_DID_LENGTH};
use crate::document::{DidDocument, DID_CONTEXT_V1};
use crate::error::CoreError;

/// Documents larger than this (encoded) get a warning.
pub const MAX_DOCUMENT_SIZE: usize = 10 * 1024;

/// Substrings that never belong in an identifier. Matched case-insensitively.
const INJECTION_BLOCKLIST: &[&str] = &[
    "javascript:",
    "vbscript:",
    "data:",
    "file:",
    "../",
    "..\\",
    "%2e%2e",
    "..%2f",
    "..%5c",
    "%3c",
    "<script",
    "</",
    "<!",
    "onerror=",
    "onload=",
];

/// Service endpoint schemes that would execute rather than locate.
const FORBIDDEN_ENDPOINT_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:", "file:"];

/// Outcome of [`validate_did`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub method: Option<String>,
    pub identifier: Option<String>,
}

impl DidValidation {
    fn finish(mut self) -> Self {
        self.valid = self.errors.is_empty();
        self
    }
}

/// Outcome of [`validate_document`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl DocumentValidation {
    /// Convert into a `Result`, joining all errors.
    pub fn into_result(self) -> Result<Vec<String>, CoreError> {
        if self.valid {
            Ok(self.warnings)
        } else {
            Err(CoreError::InvalidDocument(self.errors.join("; ")))
        }
    }
}

/// Validate an identifier string.
///
/// Checks, in order:
/// - length (non-empty, at most 100 characters)
/// - injection blocklist
/// - scheme, method token and identifier-part character set
/// - method-specific grammar for `key`, `web` and `ethr`
///
/// Unknown but well-formed methods produce a warning only.
pub fn validate_did(input: &str) -> DidValidation {
    let mut report = DidValidation::default();

    // 1. Length
    if input.is_empty() {
        report.errors.push("DID is empty".into());
        return report.finish();
    }
    if input.len() > MAX_DID_LENGTH {
        report.errors.push(format!(
            "DID is {} characters, maximum is {MAX_DID_LENGTH}",
            input.len()
        ));
        return report.finish();
    }

    // 2. Injection blocklist
    let lowered = input.to_ascii_lowercase();
    for pattern in INJECTION_BLOCKLIST {
        if lowered.contains(pattern) {
            report
                .errors
                .push(format!("DID contains forbidden sequence {pattern:?}"));
        }
    }
    if contains_tag_opener(input) {
        report.errors.push("DID contains an HTML tag opener".into());
    }
    if !report.errors.is_empty() {
        return report.finish();
    }

    // 3. Structure
    let mut parts = input.splitn(3, ':');
    let scheme = parts.next().unwrap_or_default();
    let method = parts.next();
    let specific = parts.next();

    if scheme != DID_SCHEME {
        report
            .errors
            .push(format!("scheme must be \"{DID_SCHEME}\", got {scheme:?}"));
        return report.finish();
    }

    let Some(method) = method.filter(|m| !m.is_empty()) else {
        report.errors.push("missing method".into());
        return report.finish();
    };
    if !method
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    {
        report
            .errors
            .push(format!("method {method:?} must be lowercase alphanumeric"));
    }
    report.method = Some(method.to_string());

    let Some(specific) = specific.filter(|s| !s.is_empty()) else {
        report.errors.push("missing method-specific identifier".into());
        return report.finish();
    };
    report.identifier = Some(specific.to_string());

    if let Some(bad) = specific.chars().find(|c| !is_id_char(*c)) {
        report
            .errors
            .push(format!("identifier contains disallowed character {bad:?}"));
    }
    if !percent_encoding_well_formed(specific) {
        report
            .errors
            .push("identifier contains a malformed percent-encoding".into());
    }
    if specific.ends_with(':') {
        report.errors.push("identifier must not end with ':'".into());
    }
    if !report.errors.is_empty() {
        return report.finish();
    }

    // 4. Method-specific grammar
    match DidMethod::from_name(method) {
        DidMethod::Key => check_key_method(specific, &mut report),
        DidMethod::Web => check_web_method(specific, &mut report),
        DidMethod::Ethr => check_ethr_method(specific, &mut report),
        DidMethod::Other(name) => report
            .warnings
            .push(format!("unknown DID method {name:?}, no method-specific checks")),
    }

    report.finish()
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '%')
}

fn contains_tag_opener(s: &str) -> bool {
    s.as_bytes()
        .windows(2)
        .any(|w| w[0] == b'<' && (w[1].is_ascii_alphabetic() || w[1] == b'/' || w[1] == b'!'))
}

fn percent_encoding_well_formed(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len() {
                return false;
            }
            if !(bytes[i + 1].is_ascii_hexdigit() && bytes[i + 2].is_ascii_hexdigit()) {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

fn is_base58_char(c: char) -> bool {
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

fn check_key_method(specific: &str, report: &mut DidValidation) {
    let Some(body) = specific.strip_prefix('z') else {
        report
            .errors
            .push("did:key identifier must be multibase base58btc (prefix 'z')".into());
        return;
    };
    if body.is_empty() || !body.chars().all(is_base58_char) {
        report
            .errors
            .push("did:key identifier contains non-base58btc characters".into());
        return;
    }
    match Ed25519PublicKey::from_multibase(specific) {
        Ok(_) => {}
        Err(CoreError::UnsupportedKeyType(kind)) => report.warnings.push(format!(
            "did:key uses {kind}; only Ed25519 keys can authenticate"
        )),
        Err(e) => report.errors.push(format!("did:key key encoding: {e}")),
    }
}

fn check_web_method(specific: &str, report: &mut DidValidation) {
    let mut segments = specific.split(':');
    let host = segments.next().unwrap_or_default();

    // A port is percent-encoded as %3A.
    let (hostname, port) = match host.to_ascii_lowercase().split_once("%3a") {
        Some((h, p)) => (h.to_string(), Some(p.to_string())),
        None => (host.to_ascii_lowercase(), None),
    };

    if let Some(port) = port {
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) || port.parse::<u16>().is_err() {
            report.errors.push(format!("did:web port {port:?} is not a number"));
        }
    }

    if hostname == "localhost" {
        report
            .warnings
            .push("did:web host is localhost".into());
    } else if let Err(reason) = check_dns_name(&hostname) {
        report.errors.push(format!("did:web host {hostname:?} {reason}"));
    }

    for segment in segments {
        if segment.is_empty() {
            report.errors.push("did:web path has an empty segment".into());
        } else if segment == "." || segment == ".." {
            report.errors.push("did:web path must not contain dot segments".into());
        } else if segment.contains('%') {
            report
                .warnings
                .push(format!("did:web path segment {segment:?} is percent-encoded"));
        }
    }
}

fn check_dns_name(name: &str) -> Result<(), &'static str> {
    if name.len() > 253 {
        return Err("exceeds 253 characters");
    }
    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 {
        return Err("must be a fully qualified domain name");
    }
    for label in &labels {
        if label.is_empty() || label.len() > 63 {
            return Err("has an empty or oversized label");
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err("has a label starting or ending with '-'");
        }
        if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err("has a label with characters outside [a-z0-9-]");
        }
    }
    if labels
        .last()
        .is_some_and(|tld| tld.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err("must not be an IP address");
    }
    Ok(())
}

fn check_ethr_method(specific: &str, report: &mut DidValidation) {
    let (network, address) = match specific.rsplit_once(':') {
        Some((network, address)) => (Some(network), address),
        None => (None, specific),
    };

    if let Some(network) = network {
        let named = !network.is_empty()
            && network
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
        let chain_id = network
            .strip_prefix("0x")
            .is_some_and(|h| !h.is_empty() && h.bytes().all(|b| b.is_ascii_hexdigit()));
        if !(named || chain_id) {
            report
                .errors
                .push(format!("did:ethr network {network:?} is neither a name nor a hex chain id"));
        }
    }

    let Some(hex_part) = address.strip_prefix("0x") else {
        report
            .errors
            .push("did:ethr address must start with 0x".into());
        return;
    };
    let all_hex = hex_part.bytes().all(|b| b.is_ascii_hexdigit());
    match (hex_part.len(), all_hex) {
        (40, true) => {}
        (66, true) => report
            .warnings
            .push("did:ethr identifier is a public key, not an address".into()),
        _ => report.errors.push(
            "did:ethr suffix must be 0x followed by 40 (address) or 66 (public key) hex digits"
                .into(),
        ),
    }
}

/// Validate a document against the default size limit.
pub fn validate_document(doc: &DidDocument, encoded_len: usize) -> DocumentValidation {
    validate_document_with_limit(doc, encoded_len, MAX_DOCUMENT_SIZE)
}

/// Validate a document's structure.
///
/// Missing verification-method fields and dangling relation references are
/// hard errors. Size, context and timestamp problems are warnings.
pub fn validate_document_with_limit(
    doc: &DidDocument,
    encoded_len: usize,
    max_size: usize,
) -> DocumentValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // 1. Document id
    let id_report = validate_did(&doc.id);
    if !id_report.valid {
        errors.push(format!("document id: {}", id_report.errors.join("; ")));
    }

    // 2. Context
    if doc.context.is_empty() {
        warnings.push("missing @context".into());
    } else if !doc.context.iter().any(|c| c == DID_CONTEXT_V1) {
        warnings.push(format!("@context does not include {DID_CONTEXT_V1}"));
    }

    // 3. Verification methods
    if doc.verification_method.is_empty() {
        errors.push("verificationMethod is empty".into());
    }
    let mut seen = HashSet::new();
    for (i, vm) in doc.verification_method.iter().enumerate() {
        if vm.id.is_empty() {
            errors.push(format!("verificationMethod[{i}] missing id"));
        } else if !seen.insert(vm.id.as_str()) {
            errors.push(format!("verificationMethod id {:?} is duplicated", vm.id));
        }
        if vm.type_.is_empty() {
            errors.push(format!("verificationMethod[{i}] missing type"));
        }
        if vm.controller.is_empty() {
            errors.push(format!("verificationMethod[{i}] missing controller"));
        }
        if !vm.has_key_material() {
            errors.push(format!("verificationMethod[{i}] missing key material"));
        } else if let Err(e) = vm.public_key() {
            warnings.push(format!("verificationMethod[{i}] key unusable: {e}"));
        }
    }

    // 4. Relations must point at declared methods
    let relations = [
        ("authentication", &doc.authentication),
        ("assertionMethod", &doc.assertion_method),
        ("capabilityInvocation", &doc.capability_invocation),
        ("capabilityDelegation", &doc.capability_delegation),
    ];
    for (name, refs) in relations {
        for reference in refs {
            if doc.verification_method(reference).is_none() {
                errors.push(format!("{name} references unknown method {reference:?}"));
            }
        }
    }

    // 5. Services
    for (i, svc) in doc.service.iter().enumerate() {
        if svc.id.is_empty() {
            errors.push(format!("service[{i}] missing id"));
        }
        if svc.type_.is_empty() {
            errors.push(format!("service[{i}] missing type"));
        }
        let endpoint = svc.service_endpoint.trim().to_ascii_lowercase();
        if endpoint.is_empty() {
            errors.push(format!("service[{i}] missing serviceEndpoint"));
        } else if FORBIDDEN_ENDPOINT_SCHEMES
            .iter()
            .any(|scheme| endpoint.starts_with(scheme))
        {
            errors.push(format!("service[{i}] endpoint uses an executable URL scheme"));
        } else if !endpoint.starts_with("https://") {
            warnings.push(format!("service[{i}] endpoint is not https"));
        }
    }

    // 6. Size and timestamps
    if encoded_len > max_size {
        warnings.push(format!(
            "document is {encoded_len} bytes, larger than {max_size}"
        ));
    }
    if let (Some(created), Some(updated)) = (doc.created, doc.updated) {
        if updated < created {
            warnings.push("updated precedes created".into());
        }
    }

    DocumentValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::did::Did;
    use crate::document::{Service, VerificationMethod};
    use proptest::prelude::*;

    fn key_did() -> String {
        Keypair::from_seed(&[1u8; 32]).did_key()
    }

    #[test]
    fn test_valid_identifiers() {
        for did in [
            key_did().as_str(),
            "did:web:example.com",
            "did:web:example.com:users:alice",
            "did:web:localhost%3A8443",
            "did:web:sub.example.co.uk%3A8080:path",
            "did:ethr:0xb9c5714089478a327f09197987f16f9e5d936e8a",
            "did:ethr:sepolia:0xb9c5714089478a327f09197987f16f9e5d936e8a",
            "did:ethr:0x5:0xb9c5714089478a327f09197987f16f9e5d936e8a",
            "did:example:123456789abcdefghi",
        ] {
            let report = validate_did(did);
            assert!(report.valid, "{did}: {:?}", report.errors);
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for did in [
            "",
            "did",
            "did:",
            "did:key",
            "did:key:",
            "DID:key:z6Mk",
            "urn:key:z6Mk",
            "did:Key:abc",
            "did:key:abc",
            "did:key:z0OIl",
            "did:web:localhost:..:etc",
            "did:web:nodot",
            "did:web:-bad-.com",
            "did:web:10.0.0.1",
            "did:web:example.com::x",
            "did:ethr:0x1234",
            "did:ethr:b9c5714089478a327f09197987f16f9e5d936e8a",
            "did:example:abc def",
            "did:example:abc:",
            "did:example:abc%zz",
            "did:example:javascript:alert(1)",
            "did:example:<script>",
            "did:example:..%2F..%2Fetc",
            "did:example:x/../y",
        ] {
            let report = validate_did(did);
            assert!(!report.valid, "{did} should be invalid");
            assert!(!report.errors.is_empty(), "{did} should report an error");
        }
    }

    #[test]
    fn test_oversized_identifier() {
        let did = format!("did:example:{}", "a".repeat(100));
        let report = validate_did(&did);
        assert!(!report.valid);
        assert!(report.errors[0].contains("maximum"));
    }

    #[test]
    fn test_unknown_method_warns() {
        let report = validate_did("did:example:abc");
        assert!(report.valid);
        assert_eq!(report.method.as_deref(), Some("example"));
        assert_eq!(report.identifier.as_deref(), Some("abc"));
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_ethr_public_key_warns() {
        let did = format!("did:ethr:0x{}", "ab".repeat(33));
        let report = validate_did(&did);
        assert!(report.valid, "{:?}", report.errors);
        assert!(!report.warnings.is_empty());
    }

    fn doc() -> DidDocument {
        let kp = Keypair::from_seed(&[2u8; 32]);
        let did = Did::parse(&kp.did_key()).unwrap();
        DidDocument::for_did_key(&did, kp.public_key())
    }

    #[test]
    fn test_did_key_document_is_valid() {
        let report = validate_document(&doc(), 512);
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_oversized_document_warns_only() {
        let report = validate_document(&doc(), MAX_DOCUMENT_SIZE + 1);
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_missing_method_fields_fail() {
        let mut d = doc();
        d.verification_method.push(VerificationMethod {
            id: format!("{}#key-2", d.id),
            type_: String::new(),
            controller: String::new(),
            public_key_multibase: None,
            public_key_jwk: None,
        });
        let report = validate_document(&d, 0);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn test_empty_methods_fail() {
        let mut d = doc();
        d.verification_method.clear();
        d.authentication.clear();
        d.assertion_method.clear();
        d.capability_invocation.clear();
        d.capability_delegation.clear();
        assert!(!validate_document(&d, 0).valid);
    }

    #[test]
    fn test_dangling_relation_fails() {
        let mut d = doc();
        d.authentication.push("#missing".into());
        let report = validate_document(&d, 0);
        assert!(!report.valid);
        assert!(report.errors[0].contains("#missing"));
    }

    #[test]
    fn test_executable_service_endpoint_fails() {
        let d = doc().revise(|d| {
            d.service.push(Service {
                id: "#evil".into(),
                type_: "LinkedDomains".into(),
                service_endpoint: "JavaScript:alert(1)".into(),
            })
        });
        assert!(!validate_document(&d, 0).valid);
    }

    #[test]
    fn test_document_id_must_be_valid() {
        let mut d = doc();
        d.id = "not-a-did".into();
        assert!(!validate_document(&d, 0).valid);
    }

    proptest! {
        #[test]
        fn prop_generated_key_dids_validate(seed in any::<[u8; 32]>()) {
            let did = Keypair::from_seed(&seed).did_key();
            prop_assert!(validate_did(&did).valid);
        }

        #[test]
        fn prop_generated_web_dids_validate(
            labels in proptest::collection::vec("[a-z][a-z0-9]{0,10}", 2..4),
            path in proptest::collection::vec("[a-z0-9_]{1,8}", 0..3),
        ) {
            let mut did = format!("did:web:{}", labels.join("."));
            for segment in &path {
                did.push(':');
                did.push_str(segment);
            }
            prop_assume!(did.len() <= MAX_DID_LENGTH);
            let report = validate_did(&did);
            prop_assert!(report.valid, "{} {:?}", did, report.errors);
        }

        #[test]
        fn prop_disallowed_characters_rejected(
            prefix in "[a-z0-9]{1,10}",
            bad in "[ !\"#$&'()*+,/;<=>?@\\[\\]^`{|}~]",
        ) {
            let did = format!("did:example:{prefix}{bad}");
            let report = validate_did(&did);
            prop_assert!(!report.valid);
            prop_assert!(!report.errors.is_empty());
        }

        #[test]
        fn prop_validator_never_panics(s in "\\PC{0,120}") {
            let report = validate_did(&s);
            prop_assert_eq!(report.valid, report.errors.is_empty());
        }
    }
}
