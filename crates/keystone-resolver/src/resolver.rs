//! The DID resolver.
//!
//! `resolve` runs, in order: identifier validation, rate limit, cache lookup,
//! then each registered source by priority. The first source whose output
//! parses, validates and carries the requested id wins. A source that errors,
//! times out or returns junk is skipped and audited, never fatal.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use keystone_core::time::serde_millis;
use keystone_core::{
    now_millis, validate_document_with_limit, AuditLog, Did, DidDocument, DEFAULT_AUDIT_CAPACITY,
    MAX_DOCUMENT_SIZE,
};
use keystone_store::KeyValueStore;

use crate::cache::{CacheStats, ResolutionCache};
use crate::error::{ResolutionError, Result};
use crate::rate_limit::{RateCategory, RateLimitRule, RateLimiter};
use crate::sources::{LocalSource, ResolutionSource, SourceKind};

/// Audit event names.
pub mod events {
    pub const SUCCESS: &str = "resolve.success";
    pub const CACHE_HIT: &str = "resolve.cache_hit";
    pub const RATE_LIMITED: &str = "resolve.rate_limited";
    pub const INVALID_FORMAT: &str = "resolve.invalid_format";
    pub const SOURCE_FAILED: &str = "resolve.source_failed";
    pub const SOURCE_INVALID: &str = "resolve.source_invalid";
    pub const NOT_FOUND: &str = "resolve.not_found";
    pub const PUBLISH: &str = "resolve.publish";
    pub const UNPUBLISH: &str = "resolve.unpublish";
    pub const CACHE_CLEARED: &str = "admin.cache_cleared";
    pub const CACHE_TTL_CHANGED: &str = "admin.cache_ttl_changed";
    pub const CACHE_INVALIDATED: &str = "admin.cache_invalidated";
}

/// Resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// How long a resolved document is served from cache.
    #[serde(with = "serde_millis")]
    pub cache_ttl: Duration,
    /// Per-identifier resolution limit.
    pub rate_limit: RateLimitRule,
    /// Documents larger than this are accepted with a warning.
    pub max_document_size: usize,
    /// Upper bound on a single source fetch.
    #[serde(with = "serde_millis")]
    pub source_timeout: Duration,
    pub audit_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(5 * 60),
            rate_limit: RateLimitRule::per_minute(10),
            max_document_size: MAX_DOCUMENT_SIZE,
            source_timeout: Duration::from_secs(10),
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}

pub struct Resolver {
    config: ResolverConfig,
    local: Arc<LocalSource>,
    sources: Vec<Arc<dyn ResolutionSource>>,
    cache: ResolutionCache,
    limiter: RateLimiter,
    audit: AuditLog,
}

impl Resolver {
    /// A resolver backed by `store`. The local source is always registered.
    pub fn new(store: Arc<dyn KeyValueStore>, config: ResolverConfig) -> Self {
        let local = Arc::new(LocalSource::new(store));
        Self {
            cache: ResolutionCache::new(config.cache_ttl),
            limiter: RateLimiter::new().with_rule(RateCategory::Resolution, config.rate_limit),
            audit: AuditLog::new(config.audit_capacity),
            sources: vec![local.clone() as Arc<dyn ResolutionSource>],
            local,
            config,
        }
    }

    /// Register an additional source. Sources stay sorted by priority;
    /// sources of the same kind keep registration order.
    pub fn with_source(mut self, source: Arc<dyn ResolutionSource>) -> Self {
        self.sources.push(source);
        self.sources.sort_by_key(|s| s.kind());
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Registered source kinds in the order they are tried.
    pub fn source_order(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }

    /// Resolve an identifier to a validated document.
    pub async fn resolve(&self, identifier: &str) -> Result<DidDocument> {
        // 1. Validate before bucketing
        let did = match Did::parse(identifier) {
            Ok(did) => did,
            Err(e) => {
                self.audit.record(
                    events::INVALID_FORMAT,
                    json!({ "did": identifier, "error": e.to_string() }),
                    None,
                );
                return Err(e.into());
            }
        };

        // 2. Rate limit
        if let Err(exceeded) = self.limiter.check(RateCategory::Resolution, did.as_str()) {
            let retry_after_ms = exceeded.retry_after.as_millis() as u64;
            self.audit.record(
                events::RATE_LIMITED,
                json!({ "did": did.as_str(), "retry_after_ms": retry_after_ms }),
                None,
            );
            return Err(ResolutionError::RateLimited { retry_after_ms });
        }

        // 3. Cache
        let now = now_millis();
        if let Some((document, source)) = self.cache.get(did.as_str(), now) {
            debug!(did = %did, %source, "resolution cache hit");
            self.audit.record(
                events::CACHE_HIT,
                json!({ "did": did.as_str(), "source": source.as_str() }),
                None,
            );
            return Ok(document);
        }

        // 4. Sources, in priority order
        for source in &self.sources {
            let kind = source.kind();
            if !source.supports(&did) {
                continue;
            }

            let outcome = tokio::time::timeout(self.config.source_timeout, source.fetch(&did))
                .await
                .unwrap_or_else(|_| {
                    Err(ResolutionError::Timeout(
                        self.config.source_timeout.as_millis() as u64,
                    ))
                });

            let bytes = match outcome {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    debug!(did = %did, source = %kind, "source has no document");
                    continue;
                }
                Err(e) => {
                    warn!(did = %did, source = %kind, error = %e, "resolution source failed");
                    self.audit.record(
                        events::SOURCE_FAILED,
                        json!({ "did": did.as_str(), "source": kind.as_str(), "error": e.to_string() }),
                        None,
                    );
                    continue;
                }
            };

            match self.accept(&did, &bytes) {
                Ok((document, warnings)) => {
                    self.cache.insert(did.as_str(), document.clone(), kind, now_millis());
                    info!(did = %did, source = %kind, "resolved DID");
                    self.audit.record(
                        events::SUCCESS,
                        json!({ "did": did.as_str(), "source": kind.as_str(), "warnings": warnings }),
                        None,
                    );
                    return Ok(document);
                }
                Err(reason) => {
                    warn!(did = %did, source = %kind, %reason, "source returned an invalid document");
                    self.audit.record(
                        events::SOURCE_INVALID,
                        json!({ "did": did.as_str(), "source": kind.as_str(), "error": reason }),
                        None,
                    );
                }
            }
        }

        // 5. Exhausted
        self.audit
            .record(events::NOT_FOUND, json!({ "did": did.as_str() }), None);
        Err(ResolutionError::NotFound(did.into_string()))
    }

    /// Parse and validate source output. Returns the document and any warnings.
    fn accept(&self, did: &Did, bytes: &Bytes) -> std::result::Result<(DidDocument, Vec<String>), String> {
        let document = DidDocument::from_json(bytes).map_err(|e| e.to_string())?;
        if document.id != did.as_str() {
            return Err(format!("document id {:?} does not match", document.id));
        }
        let report =
            validate_document_with_limit(&document, bytes.len(), self.config.max_document_size);
        if !report.valid {
            return Err(report.errors.join("; "));
        }
        Ok((document, report.warnings))
    }

    /// Validate and write a document to the local source.
    ///
    /// Any cached copy is dropped so the next resolution sees the new version.
    pub async fn publish(&self, document: &DidDocument, actor: Option<&str>) -> Result<()> {
        let encoded = document.to_json()?;
        validate_document_with_limit(document, encoded.len(), self.config.max_document_size)
            .into_result()?;

        self.local.put(document).await?;
        self.cache.invalidate(&document.id);
        info!(did = %document.id, "published DID document");
        self.audit.record(
            events::PUBLISH,
            json!({ "did": document.id, "bytes": encoded.len() }),
            actor,
        );
        Ok(())
    }

    /// Remove a locally published document. Idempotent.
    pub async fn unpublish(&self, did: &str, actor: Option<&str>) -> Result<bool> {
        let removed = self.local.remove(did).await?;
        self.cache.invalidate(did);
        self.audit
            .record(events::UNPUBLISH, json!({ "did": did, "removed": removed }), actor);
        Ok(removed)
    }

    /// Identifiers with a locally published document.
    pub async fn published(&self) -> Result<Vec<String>> {
        self.local.published().await
    }

    pub fn clear_cache(&self, actor: Option<&str>) -> usize {
        let removed = self.cache.clear();
        self.audit
            .record(events::CACHE_CLEARED, json!({ "removed": removed }), actor);
        removed
    }

    pub fn set_cache_ttl(&self, ttl: Duration, actor: Option<&str>) {
        let previous = self.cache.ttl();
        self.cache.set_ttl(ttl);
        self.audit.record(
            events::CACHE_TTL_CHANGED,
            json!({
                "previous_ms": previous.as_millis() as u64,
                "ttl_ms": ttl.as_millis() as u64,
            }),
            actor,
        );
    }

    pub fn invalidate(&self, did: &str, actor: Option<&str>) -> bool {
        let removed = self.cache.invalidate(did);
        self.audit.record(
            events::CACHE_INVALIDATED,
            json!({ "did": did, "removed": removed }),
            actor,
        );
        removed
    }

    pub fn purge_expired(&self) -> usize {
        let now = now_millis();
        self.limiter.purge_expired(now);
        self.cache.purge_expired(now)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
