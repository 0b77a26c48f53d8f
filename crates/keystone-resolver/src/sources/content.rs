//! Content-addressed network source.
//!
//! Documents are looked up through an HTTP gateway under the mutable-name
//! namespace, `{gateway}/ipns/{did}`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use keystone_core::{Did, DidMethod};

use super::{ResolutionSource, SourceKind};
use crate::error::Result;
use crate::fetch::Fetcher;

pub const DEFAULT_GATEWAY: &str = "https://ipfs.io";

pub struct ContentAddressedSource {
    fetcher: Arc<dyn Fetcher>,
    gateway: String,
}

impl ContentAddressedSource {
    pub fn new(fetcher: Arc<dyn Fetcher>, gateway: impl Into<String>) -> Self {
        Self {
            fetcher,
            gateway: gateway.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, did: &Did) -> String {
        format!("{}/ipns/{}", self.gateway, did)
    }
}

#[async_trait]
impl ResolutionSource for ContentAddressedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::ContentAddressed
    }

    // did:key documents are derived locally and never published.
    fn supports(&self, did: &Did) -> bool {
        did.method() != DidMethod::Key
    }

    async fn fetch(&self, did: &Did) -> Result<Option<Bytes>> {
        self.fetcher.fetch(&self.url_for(did)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::memory::MemoryFetcher;

    #[tokio::test]
    async fn test_gateway_url() {
        let fetcher = MemoryFetcher::new();
        let source = ContentAddressedSource::new(fetcher.clone(), "http://127.0.0.1:8080/");
        let did = Did::parse("did:example:abc").unwrap();
        assert_eq!(source.url_for(&did), "http://127.0.0.1:8080/ipns/did:example:abc");

        fetcher.serve(&source.url_for(&did), "{}").await;
        assert!(source.fetch(&did).await.unwrap().is_some());
    }
}
