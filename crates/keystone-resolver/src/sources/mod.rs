//! Resolution sources.
//!
//! Each source is independently fallible. The resolver tries them in
//! [`SourceKind`] order and takes the first output that validates.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use keystone_core::Did;

use crate::error::Result;

pub mod content;
pub mod ledger;
pub mod local;
pub mod web;

pub use content::ContentAddressedSource;
pub use ledger::LedgerSource;
pub use local::LocalSource;
pub use web::WebSource;

/// Source families. The derived order is the resolution priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Local,
    ContentAddressed,
    Ledger,
    Web,
}

impl SourceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::ContentAddressed => "content_addressed",
            SourceKind::Ledger => "ledger",
            SourceKind::Web => "web",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place DID documents can come from.
///
/// Implementations must be thread-safe (Send + Sync). Output is untrusted:
/// the resolver parses and validates whatever bytes come back.
#[async_trait]
pub trait ResolutionSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Whether this source can serve `did` at all. Unsupported identifiers
    /// are skipped without a fetch.
    fn supports(&self, _did: &Did) -> bool {
        true
    }

    /// Fetch the raw document. `Ok(None)` when the source has nothing.
    async fn fetch(&self, did: &Did) -> Result<Option<Bytes>>;
}
