//! HTTPS-published source (`did:web`).
//!
//! `did:web:example.com` maps to `https://example.com/.well-known/did.json`;
//! `did:web:example.com:users:alice` maps to
//! `https://example.com/users/alice/did.json`. A percent-encoded port
//! (`%3A`) is decoded into the authority.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use keystone_core::{Did, DidMethod};

use super::{ResolutionSource, SourceKind};
use crate::error::{ResolutionError, Result};
use crate::fetch::Fetcher;

pub struct WebSource {
    fetcher: Arc<dyn Fetcher>,
}

impl WebSource {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub fn url_for(did: &Did) -> Result<String> {
        if did.method() != DidMethod::Web {
            return Err(ResolutionError::InvalidFormat(format!("{did} is not did:web")));
        }
        let mut parts = did.method_specific_id().split(':');
        let host = parts
            .next()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ResolutionError::InvalidFormat(format!("{did} has no host")))?
            .replace("%3A", ":")
            .replace("%3a", ":");
        let path: Vec<&str> = parts.collect();

        if path.is_empty() {
            Ok(format!("https://{host}/.well-known/did.json"))
        } else {
            Ok(format!("https://{host}/{}/did.json", path.join("/")))
        }
    }
}

#[async_trait]
impl ResolutionSource for WebSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Web
    }

    fn supports(&self, did: &Did) -> bool {
        did.method() == DidMethod::Web
    }

    async fn fetch(&self, did: &Did) -> Result<Option<Bytes>> {
        let url = Self::url_for(did)?;
        self.fetcher.fetch(&url).await
    }
}
