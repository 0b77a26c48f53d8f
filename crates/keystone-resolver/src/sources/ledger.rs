//! Ledger-anchored source.
//!
//! Anchoring itself is out of scope. This source asks a registry endpoint
//! that speaks the universal-resolver HTTP shape,
//! `{registry}/1.0/identifiers/{did}`, and unwraps `didDocument` when the
//! response is a full resolution result.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use keystone_core::Did;

use super::{ResolutionSource, SourceKind};
use crate::error::{ResolutionError, Result};
use crate::fetch::Fetcher;

pub struct LedgerSource {
    fetcher: Arc<dyn Fetcher>,
    registry: String,
    methods: Vec<String>,
}

impl LedgerSource {
    /// A source for `did:ethr` identifiers.
    pub fn new(fetcher: Arc<dyn Fetcher>, registry: impl Into<String>) -> Self {
        Self {
            fetcher,
            registry: registry.into().trim_end_matches('/').to_string(),
            methods: vec!["ethr".to_string()],
        }
    }

    /// Serve additional ledger methods through the same registry.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.methods.push(method.into());
        self
    }

    pub fn url_for(&self, did: &Did) -> String {
        format!("{}/1.0/identifiers/{}", self.registry, did)
    }
}

/// Extract the document from a resolution result, or pass a bare document through.
fn unwrap_resolution_result(body: Bytes) -> Result<Bytes> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| ResolutionError::InvalidDocument(format!("registry response: {e}")))?;
    match value.get("didDocument") {
        Some(doc) => Ok(Bytes::from(serde_json::to_vec(doc).map_err(|e| {
            ResolutionError::InvalidDocument(format!("registry response: {e}"))
        })?)),
        None => Ok(body),
    }
}

#[async_trait]
impl ResolutionSource for LedgerSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Ledger
    }

    fn supports(&self, did: &Did) -> bool {
        self.methods.iter().any(|m| m == did.method_name())
    }

    async fn fetch(&self, did: &Did) -> Result<Option<Bytes>> {
        match self.fetcher.fetch(&self.url_for(did)).await? {
            Some(body) => Ok(Some(unwrap_resolution_result(body)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::memory::MemoryFetcher;

    const DID: &str = "did:ethr:0xb9c5714089478a327f09197987f16f9e5d936e8a";

    #[tokio::test]
    async fn test_unwraps_resolution_result() {
        let fetcher = MemoryFetcher::new();
        let source = LedgerSource::new(fetcher.clone(), "https://registry.example");
        let did = Did::parse(DID).unwrap();
        fetcher
            .serve(
                &source.url_for(&did),
                format!(r#"{{"didDocument":{{"id":"{DID}"}},"didResolutionMetadata":{{}}}}"#),
            )
            .await;

        let body = source.fetch(&did).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["id"], DID);
    }

    #[test]
    fn test_supports_only_ledger_methods() {
        let source = LedgerSource::new(MemoryFetcher::new(), "https://registry.example");
        assert!(source.supports(&Did::parse(DID).unwrap()));
        assert!(!source.supports(&Did::parse("did:web:example.com").unwrap()));
    }
}
