//! Local source: documents published into the key-value store, plus
//! documents implied by `did:key` identifiers.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use keystone_core::{Did, DidDocument, DidMethod, Ed25519PublicKey};
use keystone_store::KeyValueStore;

use super::{ResolutionSource, SourceKind};
use crate::error::Result;

/// Store key prefix for published documents.
pub const DOCUMENT_KEY_PREFIX: &str = "did-doc:";

pub struct LocalSource {
    store: Arc<dyn KeyValueStore>,
}

impl LocalSource {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn key_for(did: &str) -> String {
        format!("{DOCUMENT_KEY_PREFIX}{did}")
    }

    /// Persist a document under its id.
    pub async fn put(&self, document: &DidDocument) -> Result<()> {
        let bytes = document.to_json()?;
        self.store.set(&Self::key_for(&document.id), &bytes).await?;
        Ok(())
    }

    /// Remove a published document. Returns whether one existed.
    pub async fn remove(&self, did: &str) -> Result<bool> {
        Ok(self.store.delete(&Self::key_for(did)).await?)
    }

    /// Identifiers with a published document.
    pub async fn published(&self) -> Result<Vec<String>> {
        let keys = self.store.list(DOCUMENT_KEY_PREFIX).await?;
        Ok(keys
            .into_iter()
            .map(|k| k[DOCUMENT_KEY_PREFIX.len()..].to_string())
            .collect())
    }
}

#[async_trait]
impl ResolutionSource for LocalSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn fetch(&self, did: &Did) -> Result<Option<Bytes>> {
        if let Some(bytes) = self.store.get(&Self::key_for(did.as_str())).await? {
            return Ok(Some(Bytes::from(bytes)));
        }

        if did.method() == DidMethod::Key {
            let key = Ed25519PublicKey::from_multibase(did.method_specific_id())?;
            let document = DidDocument::for_did_key(did, key);
            return Ok(Some(Bytes::from(document.to_json()?)));
        }

        Ok(None)
    }
}
