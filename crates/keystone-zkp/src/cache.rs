//! Bounded cache of generated proofs.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use keystone_core::AuditLog;

use crate::proof::{ProofId, ZkProof};
use crate::statement::StatementType;

pub mod events {
    pub const CACHED: &str = "proof.cached";
    pub const EVICTED: &str = "proof.evicted";
    pub const REMOVED: &str = "proof.removed";
    pub const PURGED: &str = "proof.purged";
    pub const GENERATED: &str = "proof.generated";
    pub const VERIFY_FAILED: &str = "proof.verify_failed";
}

#[derive(Debug, Clone)]
pub struct CachedProof {
    pub proof: ZkProof,
    pub created: i64,
    pub last_accessed: i64,
    pub access_count: u64,
}

/// Aggregate view over the cache contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofCacheStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub capacity: usize,
    pub by_type: BTreeMap<StatementType, usize>,
    pub by_security_level: BTreeMap<u32, usize>,
}

#[derive(Debug)]
pub struct ProofCache {
    capacity: usize,
    entries: Mutex<HashMap<ProofId, CachedProof>>,
    audit: AuditLog,
}

impl ProofCache {
    pub fn new(capacity: usize, audit_capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
            audit: AuditLog::new(audit_capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Insert a proof, evicting the oldest-created entries past capacity.
    pub fn insert(&self, proof: ZkProof, now: i64) {
        let id = proof.id;
        let statement = proof.statement_type();
        let mut evicted = Vec::new();
        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.insert(
                id,
                CachedProof {
                    proof,
                    created: now,
                    last_accessed: now,
                    access_count: 0,
                },
            );
            while entries.len() > self.capacity {
                let Some(oldest) = entries
                    .iter()
                    .filter(|(k, _)| **k != id)
                    .min_by_key(|(k, e)| (e.created, **k))
                    .map(|(k, _)| *k)
                else {
                    break;
                };
                entries.remove(&oldest);
                evicted.push(oldest);
            }
        }

        self.audit.record(
            events::CACHED,
            json!({ "id": id.to_hex(), "statement": statement }),
            None,
        );
        for old in evicted {
            tracing::debug!(id = %old, "evicted proof from cache");
            self.audit
                .record(events::EVICTED, json!({ "id": old.to_hex() }), None);
        }
    }

    /// Fetch a proof and record the access.
    pub fn get(&self, id: &ProofId, now: i64) -> Option<ZkProof> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get_mut(id)?;
        entry.last_accessed = now;
        entry.access_count += 1;
        Some(entry.proof.clone())
    }

    /// Cache bookkeeping for one proof, without counting as an access.
    pub fn entry(&self, id: &ProofId) -> Option<CachedProof> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(id).cloned()
    }

    pub fn remove(&self, id: &ProofId) -> bool {
        let removed = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.remove(id).is_some()
        };
        if removed {
            self.audit
                .record(events::REMOVED, json!({ "id": id.to_hex() }), None);
        }
        removed
    }

    /// Drop proofs past their expiry. Returns how many were removed.
    pub fn purge_expired(&self, now: i64) -> usize {
        let purged = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let before = entries.len();
            entries.retain(|_, e| !e.proof.is_expired(now));
            before - entries.len()
        };
        if purged > 0 {
            self.audit
                .record(events::PURGED, json!({ "count": purged }), None);
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self, now: i64) -> ProofCacheStats {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stats = ProofCacheStats {
            total: entries.len(),
            capacity: self.capacity,
            ..Default::default()
        };
        for entry in entries.values() {
            if entry.proof.is_expired(now) {
                stats.expired += 1;
            } else {
                stats.active += 1;
            }
            *stats.by_type.entry(entry.proof.statement_type()).or_default() += 1;
            *stats
                .by_security_level
                .entry(entry.proof.metadata.security_level)
                .or_default() += 1;
        }
        stats
    }
}
