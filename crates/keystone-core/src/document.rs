//! DID documents.
//!
//! The wire shape follows DID Core:
//! `{ "@context", id, verificationMethod[], authentication[], assertionMethod[], service[], created, updated }`.
//!
//! Documents are values. Changing one means calling [`DidDocument::revise`],
//! which returns a new document with a refreshed `updated` timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::Ed25519PublicKey;
use crate::did::Did;
use crate::error::{CoreError, Result};

pub const DID_CONTEXT_V1: &str = "https://www.w3.org/ns/did/v1";
pub const ED25519_2020_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2020/v1";

/// Verification method type used for synthesised `did:key` documents.
pub const ED25519_VERIFICATION_KEY_2020: &str = "Ed25519VerificationKey2020";

/// Fragment of the single verification method in a `did:key` document.
pub const DID_KEY_FRAGMENT: &str = "key-1";

/// A JSON Web Key. Only the members an `OKP` key needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

/// One public-key entry within a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub controller: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_multibase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<Jwk>,
}

impl VerificationMethod {
    pub fn has_key_material(&self) -> bool {
        self.public_key_multibase.is_some() || self.public_key_jwk.is_some()
    }

    /// Decode the Ed25519 key, preferring multibase over JWK.
    pub fn public_key(&self) -> Result<Ed25519PublicKey> {
        if let Some(mb) = &self.public_key_multibase {
            return Ed25519PublicKey::from_multibase(mb);
        }
        if let Some(jwk) = &self.public_key_jwk {
            return Ed25519PublicKey::from_jwk(jwk);
        }
        Err(CoreError::MissingKeyMaterial(self.id.clone()))
    }
}

/// A service endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub service_endpoint: String,
}

/// Resolved metadata for a DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context", default)]
    pub context: Vec<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,
    #[serde(default)]
    pub authentication: Vec<String>,
    #[serde(default)]
    pub assertion_method: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_invocation: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_delegation: Vec<String>,
    #[serde(default)]
    pub service: Vec<Service>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl DidDocument {
    /// An empty document for `did`, timestamps set to now.
    pub fn new(did: &Did) -> Self {
        let now = Utc::now();
        Self {
            context: vec![DID_CONTEXT_V1.to_string()],
            id: did.to_string(),
            controller: None,
            verification_method: Vec::new(),
            authentication: Vec::new(),
            assertion_method: Vec::new(),
            capability_invocation: Vec::new(),
            capability_delegation: Vec::new(),
            service: Vec::new(),
            created: Some(now),
            updated: Some(now),
        }
    }

    /// Build the document a `did:key` identifier implies.
    ///
    /// One verification method, `#key-1`, referenced from every relation.
    pub fn for_did_key(did: &Did, public_key: Ed25519PublicKey) -> Self {
        let vm_id = did.with_fragment(DID_KEY_FRAGMENT);
        let mut doc = Self::new(did);
        doc.context.push(ED25519_2020_CONTEXT.to_string());
        doc.verification_method.push(VerificationMethod {
            id: vm_id.clone(),
            type_: ED25519_VERIFICATION_KEY_2020.to_string(),
            controller: did.to_string(),
            public_key_multibase: Some(public_key.to_multibase()),
            public_key_jwk: None,
        });
        doc.authentication.push(vm_id.clone());
        doc.assertion_method.push(vm_id.clone());
        doc.capability_invocation.push(vm_id.clone());
        doc.capability_delegation.push(vm_id);
        doc
    }

    /// Return a copy with `change` applied and `updated` refreshed.
    pub fn revise(&self, change: impl FnOnce(&mut DidDocument)) -> DidDocument {
        let mut next = self.clone();
        change(&mut next);
        next.updated = Some(Utc::now());
        next
    }

    /// Look up a verification method by absolute (`did:x:y#k`) or relative (`#k`) id.
    pub fn verification_method(&self, reference: &str) -> Option<&VerificationMethod> {
        let absolute = if reference.starts_with('#') {
            format!("{}{}", self.id, reference)
        } else {
            reference.to_string()
        };
        self.verification_method.iter().find(|vm| {
            vm.id == absolute || (vm.id.starts_with('#') && format!("{}{}", self.id, vm.id) == absolute)
        })
    }

    /// Key material of the first verification method.
    pub fn primary_public_key(&self) -> Result<Ed25519PublicKey> {
        self.verification_method
            .first()
            .ok_or_else(|| CoreError::InvalidDocument("no verification methods".into()))?
            .public_key()
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }
}
