//! Fixed-window rate limiting.
//!
//! Each (category, key) pair owns a bucket of `(count, reset_at)`. The first
//! request after `reset_at` opens a fresh window. Categories are independent:
//! exhausting challenge creation for a DID does not affect its resolution.
//!
//! Closed buckets are swept whenever the table grows past its sweep
//! threshold, so a stream of one-off keys cannot grow it without bound.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use keystone_core::now_millis;
use keystone_core::time::{duration_millis, serde_millis};

/// Operation categories with independent buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateCategory {
    ChallengeCreation,
    Authentication,
    Resolution,
}

impl RateCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RateCategory::ChallengeCreation => "challenge_creation",
            RateCategory::Authentication => "authentication",
            RateCategory::Resolution => "resolution",
        }
    }
}

/// At most `max_requests` per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub max_requests: u32,
    #[serde(with = "serde_millis")]
    pub window: Duration,
}

impl RateLimitRule {
    pub const fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

/// Returned when a bucket is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitExceeded {
    pub category: RateCategory,
    pub retry_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u32,
    reset_at: i64,
}

/// Bucket count above which opening a new bucket first sweeps closed ones.
pub const DEFAULT_SWEEP_THRESHOLD: usize = 10_000;

/// In-process fixed-window limiter.
#[derive(Debug)]
pub struct RateLimiter {
    rules: HashMap<RateCategory, RateLimitRule>,
    buckets: Mutex<HashMap<(RateCategory, String), Bucket>>,
    sweep_threshold: usize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            rules: HashMap::new(),
            buckets: Mutex::new(HashMap::new()),
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
        }
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold;
        self
    }

    /// Install a rule for `category`. Categories without a rule are unlimited.
    pub fn with_rule(mut self, category: RateCategory, rule: RateLimitRule) -> Self {
        self.rules.insert(category, rule);
        self
    }

    pub fn rule(&self, category: RateCategory) -> Option<RateLimitRule> {
        self.rules.get(&category).copied()
    }

    /// Count one request against the bucket.
    pub fn check(&self, category: RateCategory, key: &str) -> Result<(), RateLimitExceeded> {
        self.check_at(category, key, now_millis())
    }

    /// [`check`](Self::check) with an explicit clock, in Unix milliseconds.
    pub fn check_at(
        &self,
        category: RateCategory,
        key: &str,
        now: i64,
    ) -> Result<(), RateLimitExceeded> {
        let Some(rule) = self.rule(category) else {
            return Ok(());
        };

        let window_end = now.saturating_add(duration_millis(rule.window));
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket_key = (category, key.to_string());
        if buckets.len() >= self.sweep_threshold && !buckets.contains_key(&bucket_key) {
            let before = buckets.len();
            buckets.retain(|_, b| now < b.reset_at);
            tracing::debug!(swept = before - buckets.len(), "swept closed rate-limit buckets");
        }
        let bucket = buckets.entry(bucket_key).or_insert(Bucket {
            count: 0,
            reset_at: window_end,
        });

        if now >= bucket.reset_at {
            bucket.count = 0;
            bucket.reset_at = window_end;
        }

        if bucket.count >= rule.max_requests {
            let wait = bucket.reset_at.saturating_sub(now).max(0) as u64;
            tracing::warn!(
                category = category.as_str(),
                key,
                count = bucket.count,
                max = rule.max_requests,
                "rate limit exceeded"
            );
            return Err(RateLimitExceeded {
                category,
                retry_after: Duration::from_millis(wait),
            });
        }

        bucket.count += 1;
        Ok(())
    }

    /// Requests left in the current window.
    pub fn remaining(&self, category: RateCategory, key: &str) -> Option<u32> {
        self.remaining_at(category, key, now_millis())
    }

    pub fn remaining_at(&self, category: RateCategory, key: &str, now: i64) -> Option<u32> {
        let rule = self.rule(category)?;
        let buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let used = match buckets.get(&(category, key.to_string())) {
            Some(bucket) if now < bucket.reset_at => bucket.count,
            _ => 0,
        };
        Some(rule.max_requests.saturating_sub(used))
    }

    /// Drop the bucket for `key` (admin operation).
    pub fn reset(&self, category: RateCategory, key: &str) {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        buckets.remove(&(category, key.to_string()));
    }

    /// Buckets currently tracked, open or closed.
    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop buckets whose window has closed.
    pub fn purge_expired(&self, now: i64) -> usize {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let before = buckets.len();
        buckets.retain(|_, b| now < b.reset_at);
        before - buckets.len()
    }
}
