//! The Keystone context: every component, wired once.

use std::sync::Arc;

use keystone_core::DidDocument;
use keystone_resolver::{
    ContentAddressedSource, Fetcher, HttpFetcher, LedgerSource, ResolutionSource, Resolver,
    WebSource,
};
use keystone_store::{KeyValueStore, MemoryStore};
use keystone_zkp::{ProofEngine, Statement, ZkProof};

use crate::authenticator::Authenticator;
use crate::config::KeystoneConfig;
use crate::error::{KeystoneError, Result};
use crate::session::{Challenge, Session};

/// Owns the resolver, authenticator and proof engine for one deployment.
///
/// Components are shared through `Arc`, so handing out
/// [`resolver`](Self::resolver) or [`proofs`](Self::proofs) to other tasks
/// is cheap.
pub struct Keystone {
    config: KeystoneConfig,
    store: Arc<dyn KeyValueStore>,
    resolver: Arc<Resolver>,
    proofs: Arc<ProofEngine>,
    auth: Authenticator,
}

impl Keystone {
    pub fn builder() -> KeystoneBuilder {
        KeystoneBuilder::default()
    }

    /// An in-memory context with default configuration and the local source only.
    pub fn in_memory() -> Self {
        Self::builder().build_local()
    }

    pub fn config(&self) -> &KeystoneConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn proofs(&self) -> &Arc<ProofEngine> {
        &self.proofs
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Core surface
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn resolve(&self, identifier: &str) -> Result<DidDocument> {
        Ok(self.resolver.resolve(identifier).await?)
    }

    /// Validate and store a document so the local source serves it.
    pub async fn publish(&self, document: &DidDocument) -> Result<()> {
        Ok(self.resolver.publish(document, Some(document.id.as_str())).await?)
    }

    pub async fn create_challenge(
        &self,
        identifier: &str,
        ttl: Option<std::time::Duration>,
    ) -> Result<Challenge> {
        Ok(self.auth.create_challenge(identifier, ttl).await?)
    }

    pub async fn authenticate(&self, identifier: &str, envelope: &str) -> Option<Session> {
        self.auth.authenticate(identifier, envelope).await
    }

    pub async fn authenticate_with_proof(&self, identifier: &str, proof: &ZkProof) -> Option<Session> {
        self.auth.authenticate_with_proof(identifier, proof).await
    }

    pub async fn is_authenticated(&self, identifier: &str) -> bool {
        self.auth.is_authenticated(identifier).await
    }

    pub async fn logout(&self, identifier: &str) -> Result<()> {
        Ok(self.auth.logout(identifier).await?)
    }

    pub fn generate_proof(&self, statement: Statement) -> Result<ZkProof> {
        Ok(self.proofs.generate_proof(statement)?)
    }

    pub fn verify_proof(&self, proof: &ZkProof) -> bool {
        self.proofs.verify_proof(proof)
    }

    /// Housekeeping across every component. Returns the number of records dropped.
    pub async fn purge_expired(&self) -> Result<usize> {
        let resolved = self.resolver.purge_expired();
        let proofs = self.proofs.purge_expired();
        let auth = self.auth.purge_expired().await?;
        Ok(resolved + proofs + auth)
    }
}

/// Builder for [`Keystone`].
#[derive(Default)]
pub struct KeystoneBuilder {
    config: KeystoneConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    fetcher: Option<Arc<dyn Fetcher>>,
    sources: Vec<Arc<dyn ResolutionSource>>,
}

impl KeystoneBuilder {
    pub fn config(mut self, config: KeystoneConfig) -> Self {
        self.config = config;
        self
    }

    /// Persistence backend. Defaults to [`MemoryStore`].
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Fetcher for the network sources. Defaults to an [`HttpFetcher`]
    /// built from `config.network.http`.
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// An extra resolution source, tried in priority order with the rest.
    pub fn source(mut self, source: Arc<dyn ResolutionSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Build. Network sources are registered when `config.network.enabled`
    /// is set or a fetcher was supplied.
    pub fn build(self) -> Result<Keystone> {
        let network = self.config.network.clone();
        let fetcher = match self.fetcher.clone() {
            Some(fetcher) => Some(fetcher),
            None if network.enabled => Some(Arc::new(
                HttpFetcher::new(network.http.clone())
                    .map_err(|e| KeystoneError::Config(e.to_string()))?,
            ) as Arc<dyn Fetcher>),
            None => None,
        };

        let mut sources = self.sources.clone();
        if let Some(fetcher) = fetcher {
            sources.push(Arc::new(ContentAddressedSource::new(
                fetcher.clone(),
                network.gateway.clone(),
            )));
            sources.push(Arc::new(LedgerSource::new(
                fetcher.clone(),
                network.registry.clone(),
            )));
            sources.push(Arc::new(WebSource::new(fetcher)));
        }
        Ok(self.assemble(sources))
    }

    /// Build with only the local source and any explicitly added ones.
    pub fn build_local(self) -> Keystone {
        let sources = self.sources.clone();
        self.assemble(sources)
    }

    fn assemble(self, sources: Vec<Arc<dyn ResolutionSource>>) -> Keystone {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>);
        let config = self.config;

        let resolver = sources.into_iter().fold(
            Resolver::new(store.clone(), config.resolver.clone()),
            Resolver::with_source,
        );
        let resolver = Arc::new(resolver);
        let proofs = Arc::new(ProofEngine::new(config.proofs.clone()));
        let auth = Authenticator::new(
            resolver.clone(),
            proofs.clone(),
            store.clone(),
            config.auth.clone(),
        );
        tracing::debug!(sources = ?resolver.source_order(), "keystone assembled");

        Keystone {
            config,
            store,
            resolver,
            proofs,
            auth,
        }
    }
}
