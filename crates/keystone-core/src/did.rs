//! Decentralized identifiers.
//!
//! A [`Did`] can only be constructed through [`Did::parse`], which runs the
//! full validator. Holding one is proof the string passed syntax checks.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::validation::validate_did;

/// The fixed scheme of every identifier.
pub const DID_SCHEME: &str = "did";

/// Identifiers longer than this are rejected outright.
pub const MAX_DID_LENGTH: usize = 100;

/// Methods the validator knows a grammar for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DidMethod {
    /// `did:key` - the identifier is the public key.
    Key,
    /// `did:web` - document published over HTTPS.
    Web,
    /// `did:ethr` - ledger-anchored identifier.
    Ethr,
    /// Well-formed but without method-specific checks.
    Other(String),
}

impl DidMethod {
    pub fn from_name(name: &str) -> Self {
        match name {
            "key" => DidMethod::Key,
            "web" => DidMethod::Web,
            "ethr" => DidMethod::Ethr,
            other => DidMethod::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DidMethod::Key => "key",
            DidMethod::Web => "web",
            DidMethod::Ethr => "ethr",
            DidMethod::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, DidMethod::Other(_))
    }
}

/// A validated decentralized identifier. Immutable.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Did(String);

impl Did {
    /// Validate and wrap an identifier string.
    pub fn parse(s: &str) -> Result<Self> {
        let report = validate_did(s);
        if !report.valid {
            return Err(CoreError::InvalidDid(report.errors.join("; ")));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The method token, e.g. `key` in `did:key:z6Mk...`.
    pub fn method_name(&self) -> &str {
        self.0
            .split(':')
            .nth(1)
            .unwrap_or_default()
    }

    pub fn method(&self) -> DidMethod {
        DidMethod::from_name(self.method_name())
    }

    /// Everything after `did:<method>:`.
    pub fn method_specific_id(&self) -> &str {
        let prefix_len = DID_SCHEME.len() + 1 + self.method_name().len() + 1;
        &self.0[prefix_len..]
    }

    /// A DID URL pointing at a fragment of this identifier's document.
    pub fn with_fragment(&self, fragment: &str) -> String {
        format!("{}#{}", self.0, fragment.trim_start_matches('#'))
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({})", self.0)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Did {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Did::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_components() {
        let did = Did::parse("did:web:example.com:users:alice").unwrap();
        assert_eq!(did.method(), DidMethod::Web);
        assert_eq!(did.method_specific_id(), "example.com:users:alice");
        assert_eq!(did.to_string(), "did:web:example.com:users:alice");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(Did::parse("").is_err());
        assert!(Did::parse("urn:uuid:1234").is_err());
        assert!("did:key".parse::<Did>().is_err());
    }

    #[test]
    fn test_with_fragment() {
        let did = Did::parse("did:example:abc").unwrap();
        assert_eq!(did.with_fragment("key-1"), "did:example:abc#key-1");
        assert_eq!(did.with_fragment("#key-1"), "did:example:abc#key-1");
    }

    #[test]
    fn test_unknown_method_is_other() {
        let did = Did::parse("did:example:abc").unwrap();
        assert_eq!(did.method(), DidMethod::Other("example".into()));
        assert!(!did.method().is_known());
    }

    #[test]
    fn test_serde_validates() {
        let ok: Did = serde_json::from_str("\"did:example:abc\"").unwrap();
        assert_eq!(ok.as_str(), "did:example:abc");
        assert!(serde_json::from_str::<Did>("\"did:<script>\"").is_err());
    }
}
