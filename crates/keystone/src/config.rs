//! Configuration.
//!
//! Every struct is `serde(default)`, so an embedder can load a partial JSON
//! file and inherit the rest. Durations are integer milliseconds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use keystone_core::time::serde_millis;
use keystone_core::DEFAULT_AUDIT_CAPACITY;
use keystone_resolver::sources::content::DEFAULT_GATEWAY;
use keystone_resolver::{HttpFetcherConfig, RateLimitRule, ResolverConfig};
use keystone_zkp::ProofEngineConfig;

use crate::session::Permission;

/// Smallest nonce accepted, in bytes.
pub const MIN_NONCE_BYTES: usize = 32;

/// Default universal-resolver registry for ledger-anchored methods.
pub const DEFAULT_REGISTRY: &str = "https://dev.uniresolver.io";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(with = "serde_millis")]
    pub challenge_ttl: Duration,
    #[serde(with = "serde_millis")]
    pub session_ttl: Duration,
    pub challenge_rate_limit: RateLimitRule,
    pub auth_rate_limit: RateLimitRule,
    /// Added to every failed authentication.
    #[serde(with = "serde_millis")]
    pub failure_delay: Duration,
    /// Random bytes per nonce. Values below [`MIN_NONCE_BYTES`] are raised.
    pub nonce_bytes: usize,
    pub default_permissions: Vec<Permission>,
    pub audit_capacity: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            challenge_ttl: Duration::from_secs(5 * 60),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            challenge_rate_limit: RateLimitRule::per_minute(5),
            auth_rate_limit: RateLimitRule::per_minute(5),
            failure_delay: Duration::from_millis(250),
            nonce_bytes: 64,
            default_permissions: vec![Permission::Read, Permission::Write, Permission::Sync],
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}

/// Remote resolution sources. Disabled unless `enabled` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub enabled: bool,
    pub http: HttpFetcherConfig,
    pub gateway: String,
    pub registry: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            http: HttpFetcherConfig::default(),
            gateway: DEFAULT_GATEWAY.to_string(),
            registry: DEFAULT_REGISTRY.to_string(),
        }
    }
}

/// Configuration for the whole context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoneConfig {
    pub resolver: ResolverConfig,
    pub auth: AuthConfig,
    pub proofs: ProofEngineConfig,
    pub network: NetworkConfig,
}

impl KeystoneConfig {
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
