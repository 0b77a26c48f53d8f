//! Bounded in-memory audit trail.
//!
//! Each component instance owns one [`AuditLog`]. Entries past the capacity
//! evict the oldest first. Durable forwarding is left to the embedder, who
//! can drain [`AuditLog::entries`] periodically.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::time::now_millis;

/// Default number of entries kept.
pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;

/// A single audited event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub event: String,
    pub details: Value,
    /// Who triggered the event, when known (a DID or an operator name).
    pub actor: Option<String>,
}

#[derive(Debug)]
pub struct AuditLog {
    capacity: usize,
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_AUDIT_CAPACITY))),
        }
    }

    /// Append an entry, evicting the oldest if full.
    pub fn record(&self, event: &str, details: Value, actor: Option<&str>) {
        let entry = AuditEntry {
            timestamp: now_millis(),
            event: event.to_string(),
            details,
            actor: actor.map(str::to_string),
        };
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    /// Entries whose event name matches exactly.
    pub fn filter(&self, event: &str) -> Vec<AuditEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().filter(|e| e.event == event).cloned().collect()
    }

    /// The most recent entry, if any.
    pub fn last(&self) -> Option<AuditEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.back().cloned()
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

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_and_filter() {
        let log = AuditLog::default();
        log.record("resolve.success", json!({"did": "did:example:a"}), None);
        log.record("resolve.failure", json!({"did": "did:example:b"}), None);
        log.record("resolve.success", json!({"did": "did:example:c"}), Some("admin"));

        assert_eq!(log.len(), 3);
        let hits = log.filter("resolve.success");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].actor.as_deref(), Some("admin"));
        assert_eq!(log.last().unwrap().details["did"], "did:example:c");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = AuditLog::new(3);
        for i in 0..5 {
            log.record("tick", json!({ "i": i }), None);
        }
        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].details["i"], 2);
        assert_eq!(entries[2].details["i"], 4);
    }

    #[test]
    fn test_default_capacity_is_bounded() {
        let log = AuditLog::default();
        for _ in 0..(DEFAULT_AUDIT_CAPACITY + 10) {
            log.record("tick", Value::Null, None);
        }
        assert_eq!(log.len(), DEFAULT_AUDIT_CAPACITY);
    }
}
