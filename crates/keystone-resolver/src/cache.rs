//! Per-identifier TTL cache of resolved documents.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use keystone_core::time::duration_millis;
use keystone_core::DidDocument;

use crate::sources::SourceKind;

#[derive(Debug, Clone)]
struct CacheEntry {
    document: DidDocument,
    source: SourceKind,
    fetched_at: i64,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub ttl_ms: i64,
}

#[derive(Debug)]
pub struct ResolutionCache {
    ttl_ms: AtomicI64,
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResolutionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl_ms: AtomicI64::new(duration_millis(ttl)),
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.load(Ordering::Relaxed).max(0) as u64)
    }

    /// Change the TTL. Applies to existing entries too.
    pub fn set_ttl(&self, ttl: Duration) {
        self.ttl_ms.store(duration_millis(ttl), Ordering::Relaxed);
    }

    /// A document fetched less than one TTL before `now`.
    pub fn get(&self, did: &str, now: i64) -> Option<(DidDocument, SourceKind)> {
        let ttl = self.ttl_ms.load(Ordering::Relaxed);
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(did) {
                if now - entry.fetched_at < ttl {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some((entry.document.clone(), entry.source));
                }
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }

        // Stale: drop it so the map does not grow with dead entries.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries
            .get(did)
            .is_some_and(|e| now - e.fetched_at >= ttl)
        {
            entries.remove(did);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn insert(&self, did: &str, document: DidDocument, source: SourceKind, now: i64) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            did.to_string(),
            CacheEntry {
                document,
                source,
                fetched_at: now,
            },
        );
    }

    /// Drop one identifier. Returns whether it was cached.
    pub fn invalidate(&self, did: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(did).is_some()
    }

    /// Drop everything. Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let n = entries.len();
        entries.clear();
        n
    }

    pub fn purge_expired(&self, now: i64) -> usize {
        let ttl = self.ttl_ms.load(Ordering::Relaxed);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, e| now - e.fetched_at < ttl);
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            entries: entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ttl_ms: self.ttl_ms.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::{Did, Keypair};

    fn doc() -> DidDocument {
        let kp = Keypair::from_seed(&[4u8; 32]);
        DidDocument::for_did_key(&Did::parse(&kp.did_key()).unwrap(), kp.public_key())
    }

    #[test]
    fn test_hit_within_ttl_miss_after() {
        let cache = ResolutionCache::new(Duration::from_secs(300));
        let d = doc();
        cache.insert(&d.id, d.clone(), SourceKind::Local, 1_000);

        let (hit, source) = cache.get(&d.id, 1_000 + 299_999).unwrap();
        assert_eq!(hit, d);
        assert_eq!(source, SourceKind::Local);

        assert!(cache.get(&d.id, 1_000 + 300_000).is_none());
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 0));
    }

    #[test]
    fn test_set_ttl_applies_to_existing() {
        let cache = ResolutionCache::new(Duration::from_secs(300));
        let d = doc();
        cache.insert(&d.id, d.clone(), SourceKind::Web, 0);
        cache.set_ttl(Duration::from_millis(10));
        assert!(cache.get(&d.id, 10).is_none());
    }

    #[test]
    fn test_invalidate_clear_purge() {
        let cache = ResolutionCache::new(Duration::from_millis(100));
        cache.insert("did:example:a", doc(), SourceKind::Local, 0);
        cache.insert("did:example:b", doc(), SourceKind::Local, 50);
        cache.insert("did:example:c", doc(), SourceKind::Local, 90);

        assert!(cache.invalidate("did:example:c"));
        assert!(!cache.invalidate("did:example:c"));
        assert_eq!(cache.purge_expired(120), 1);
        assert_eq!(cache.clear(), 1);
        assert_eq!(cache.stats().entries, 0);
    }
}
