//! # Keystone Resolver
//!
//! Turns an opaque identifier into a validated DID document via several
//! untrusted sources.
//!
//! ## Overview
//!
//! The [`Resolver`] owns a TTL cache, a per-identifier rate limiter and an
//! audit log. Sources implement [`ResolutionSource`] and are tried in a fixed
//! priority order:
//!
//! 1. [`LocalSource`] - published documents and `did:key` derivation
//! 2. [`ContentAddressedSource`] - content-addressed network gateway
//! 3. [`LedgerSource`] - ledger-anchored registry
//! 4. [`WebSource`] - HTTPS-published `did:web` documents
//!
//! Remote sources fetch through a [`Fetcher`]; [`HttpFetcher`] is the
//! reqwest implementation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keystone_resolver::{HttpFetcher, HttpFetcherConfig, Resolver, ResolverConfig, WebSource};
//! use keystone_store::MemoryStore;
//!
//! async fn example() {
//!     let fetcher = Arc::new(HttpFetcher::new(HttpFetcherConfig::default()).unwrap());
//!     let resolver = Resolver::new(Arc::new(MemoryStore::new()), ResolverConfig::default())
//!         .with_source(Arc::new(WebSource::new(fetcher)));
//!     let doc = resolver.resolve("did:web:example.com").await.unwrap();
//! }
//! ```

pub mod cache;
pub mod error;
pub mod fetch;
pub mod rate_limit;
pub mod resolver;
pub mod sources;

pub use cache::{CacheStats, ResolutionCache};
pub use error::{ResolutionError, Result};
pub use fetch::{memory::MemoryFetcher, Fetcher, HttpFetcher, HttpFetcherConfig};
pub use rate_limit::{RateCategory, RateLimitExceeded, RateLimitRule, RateLimiter};
pub use resolver::{events, Resolver, ResolverConfig};
pub use sources::{
    ContentAddressedSource, LedgerSource, LocalSource, ResolutionSource, SourceKind, WebSource,
};
