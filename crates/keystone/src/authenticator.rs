//! Challenge-response authentication.
//!
//! Per identifier the state machine is
//! `NoChallenge -> ChallengeIssued -> {Authenticated | Expired | Mismatched}`.
//!
//! The public entry points never say why an attempt failed. Absent,
//! expired and mismatched challenges, bad signatures and resolution
//! failures all return `None` after the same artificial delay. The real
//! cause goes to the audit log.

use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use keystone_core::time::duration_millis;
use keystone_core::{
    constant_time_eq, now_millis, random_bytes, AuditLog, Did, Ed25519Signature,
};
use keystone_resolver::{RateCategory, RateLimitExceeded, RateLimiter, Resolver};
use keystone_store::{KeyValueStore, KeyValueStoreExt, StoreError};
use keystone_zkp::{Group, ProofBody, ProofEngine, StatementType, TransformKind, ZkProof};

use crate::config::{AuthConfig, MIN_NONCE_BYTES};
use crate::error::AuthError;
use crate::session::{Challenge, Session, SignatureEnvelope};

/// Store key holding the persisted device id.
pub const DEVICE_ID_KEY: &str = "device-id";
pub const CHALLENGE_PREFIX: &str = "challenge:";
pub const SESSION_PREFIX: &str = "session:";

pub mod events {
    pub const CHALLENGE_ISSUED: &str = "auth.challenge_issued";
    pub const CHALLENGE_REJECTED: &str = "auth.challenge_rejected";
    pub const SUCCESS: &str = "auth.success";
    pub const FAILED: &str = "auth.failed";
    pub const LOGOUT: &str = "auth.logout";
    pub const SESSION_EXPIRED: &str = "auth.session_expired";
    pub const STORE_ERROR: &str = "auth.store_error";
}

fn challenge_key(did: &str) -> String {
    format!("{CHALLENGE_PREFIX}{did}")
}

fn session_key(did: &str) -> String {
    format!("{SESSION_PREFIX}{did}")
}

fn rate_limited(exceeded: RateLimitExceeded) -> AuthError {
    AuthError::RateLimited {
        retry_after_ms: exceeded.retry_after.as_millis() as u64,
    }
}

pub struct Authenticator {
    config: AuthConfig,
    resolver: Arc<Resolver>,
    proofs: Arc<ProofEngine>,
    store: Arc<dyn KeyValueStore>,
    challenges: Mutex<HashMap<String, Challenge>>,
    sessions: Mutex<HashMap<String, Session>>,
    limiter: RateLimiter,
    audit: AuditLog,
    device_id: OnceCell<String>,
}

impl Authenticator {
    pub fn new(
        resolver: Arc<Resolver>,
        proofs: Arc<ProofEngine>,
        store: Arc<dyn KeyValueStore>,
        config: AuthConfig,
    ) -> Self {
        let limiter = RateLimiter::new()
            .with_rule(RateCategory::ChallengeCreation, config.challenge_rate_limit)
            .with_rule(RateCategory::Authentication, config.auth_rate_limit);
        Self {
            audit: AuditLog::new(config.audit_capacity),
            config,
            resolver,
            proofs,
            store,
            challenges: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            limiter,
            device_id: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// This installation's id. Generated on first use and persisted.
    pub async fn device_id(&self) -> Result<String, AuthError> {
        let id = self
            .device_id
            .get_or_try_init(|| async {
                if let Some(bytes) = self.store.get(DEVICE_ID_KEY).await? {
                    if let Ok(id) = String::from_utf8(bytes) {
                        if !id.is_empty() {
                            return Ok::<_, StoreError>(id);
                        }
                    }
                }
                let id = hex::encode(random_bytes(16));
                self.store.set(DEVICE_ID_KEY, id.as_bytes()).await?;
                info!(device_id = %id, "generated device id");
                Ok::<_, StoreError>(id)
            })
            .await
            .map_err(|e| self.storage_failure("device_id", None, e))?;
        Ok(id.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Challenges
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a fresh challenge for `identifier`, replacing any pending one.
    pub async fn create_challenge(
        &self,
        identifier: &str,
        ttl: Option<Duration>,
    ) -> Result<Challenge, AuthError> {
        let did = match Did::parse(identifier) {
            Ok(did) => did,
            Err(e) => {
                self.audit.record(
                    events::CHALLENGE_REJECTED,
                    json!({ "did": identifier, "kind": "invalid_format" }),
                    None,
                );
                return Err(e.into());
            }
        };
        if let Err(exceeded) = self
            .limiter
            .check(RateCategory::ChallengeCreation, did.as_str())
        {
            self.audit.record(
                events::CHALLENGE_REJECTED,
                json!({ "did": did.as_str(), "kind": "rate_limited" }),
                Some(did.as_str()),
            );
            return Err(rate_limited(exceeded));
        }

        let now = now_millis();
        let ttl = ttl.unwrap_or(self.config.challenge_ttl);
        let challenge = Challenge {
            did: did.to_string(),
            nonce: hex::encode(random_bytes(self.config.nonce_bytes.max(MIN_NONCE_BYTES))),
            issued_at: now,
            expires_at: now.saturating_add(duration_millis(ttl)),
        };

        if let Err(e) = self
            .store
            .set_json(&challenge_key(did.as_str()), &challenge)
            .await
        {
            return Err(self.storage_failure("create_challenge", Some(did.as_str()), e));
        }
        self.challenges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(did.to_string(), challenge.clone());

        debug!(did = %did, ttl_ms = ttl.as_millis() as u64, "issued challenge");
        self.audit.record(
            events::CHALLENGE_ISSUED,
            json!({ "did": did.as_str(), "expires_at": challenge.expires_at }),
            Some(did.as_str()),
        );
        Ok(challenge)
    }

    /// Remove and return the pending challenge for `did`.
    ///
    /// Only one caller can take a given challenge.
    async fn take_challenge(&self, did: &str) -> Result<Option<Challenge>, AuthError> {
        let in_memory = self
            .challenges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(did);
        let key = challenge_key(did);
        let challenge = match in_memory {
            Some(challenge) => challenge,
            // Issued by an earlier process.
            None => match self.store.get_json::<Challenge>(&key).await? {
                Some(challenge) => challenge,
                None => return Ok(None),
            },
        };

        // The store delete is the point of consumption: whoever removes the
        // persisted record owns the challenge, even if another caller already
        // emptied the in-memory slot or read the record first.
        if self.store.delete(&key).await? {
            Ok(Some(challenge))
        } else {
            debug!(did, "challenge consumed by a concurrent attempt");
            Ok(None)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────────

    /// Exchange a signed challenge for a session.
    ///
    /// `envelope` is the encoded [`SignatureEnvelope`]. Returns `None` on any
    /// failure.
    pub async fn authenticate(&self, identifier: &str, envelope: &str) -> Option<Session> {
        let result = self.try_authenticate(identifier, envelope).await;
        self.finish(identifier, result).await
    }

    /// Exchange a zero-knowledge key-ownership proof for a session.
    ///
    /// The proof must be a Fiat–Shamir Schnorr proof over the Ed25519
    /// basepoint, for the key in the identifier's document, bound to the
    /// pending challenge's nonce.
    pub async fn authenticate_with_proof(&self, identifier: &str, proof: &ZkProof) -> Option<Session> {
        let result = self.try_authenticate_with_proof(identifier, proof).await;
        self.finish(identifier, result).await
    }

    async fn finish(
        &self,
        identifier: &str,
        result: Result<Session, AuthError>,
    ) -> Option<Session> {
        match result {
            Ok(session) => Some(session),
            Err(err) => {
                let kind = err.kind();
                warn!(did = identifier, kind = %kind, "authentication failed");
                self.audit.record(
                    events::FAILED,
                    json!({ "did": identifier, "kind": kind.as_str(), "cause": err.cause() }),
                    Some(identifier),
                );
                tokio::time::sleep(self.config.failure_delay).await;
                None
            }
        }
    }

    async fn pending_challenge(&self, did: &Did, now: i64) -> Result<Challenge, AuthError> {
        let challenge = self
            .take_challenge(did.as_str())
            .await?
            .ok_or(AuthError::NoChallenge)?;
        if challenge.is_expired(now) {
            return Err(AuthError::Expired);
        }
        Ok(challenge)
    }

    async fn try_authenticate(&self, identifier: &str, envelope: &str) -> Result<Session, AuthError> {
        let did = Did::parse(identifier)?;
        self.limiter
            .check(RateCategory::Authentication, did.as_str())
            .map_err(rate_limited)?;
        let envelope = SignatureEnvelope::decode(envelope)?;

        let now = now_millis();
        let challenge = self.pending_challenge(&did, now).await?;
        if !constant_time_eq(&challenge.nonce, &envelope.nonce) {
            return Err(AuthError::Mismatch);
        }

        let document = self.resolver.resolve(did.as_str()).await?;
        let key = document.primary_public_key()?;
        let signature = Ed25519Signature::from_hex(&envelope.signature)?;
        key.verify(envelope.nonce.as_bytes(), &signature)?;

        self.mint_session(&did, now).await
    }

    async fn try_authenticate_with_proof(
        &self,
        identifier: &str,
        proof: &ZkProof,
    ) -> Result<Session, AuthError> {
        let did = Did::parse(identifier)?;
        self.limiter
            .check(RateCategory::Authentication, did.as_str())
            .map_err(rate_limited)?;

        let ProofBody::Schnorr(body) = &proof.body else {
            return Err(AuthError::VerificationFailed("not a Schnorr proof".into()));
        };
        let meta = &proof.metadata;
        if meta.statement != StatementType::DiscreteLog
            || meta.curve != Group::Ed25519
            || meta.transform != TransformKind::FiatShamir
        {
            return Err(AuthError::VerificationFailed(
                "proof is not a non-interactive Ed25519 key-ownership proof".into(),
            ));
        }

        let now = now_millis();
        let challenge = self.pending_challenge(&did, now).await?;
        let bound_nonce = String::from_utf8(body.message.0.clone()).unwrap_or_default();
        if !constant_time_eq(&challenge.nonce, &bound_nonce) {
            return Err(AuthError::Mismatch);
        }

        let document = self.resolver.resolve(did.as_str()).await?;
        let key = document.primary_public_key()?;
        if key.0 != body.public_key.0 {
            return Err(AuthError::VerificationFailed(
                "proof is for a different key".into(),
            ));
        }
        if !self.proofs.verify_proof(proof) {
            return Err(AuthError::VerificationFailed("proof does not verify".into()));
        }

        self.mint_session(&did, now).await
    }

    async fn mint_session(&self, did: &Did, now: i64) -> Result<Session, AuthError> {
        let session = Session {
            did: did.to_string(),
            authenticated_at: now,
            expires_at: now.saturating_add(duration_millis(self.config.session_ttl)),
            device_id: self.device_id().await?,
            permissions: self.config.default_permissions.clone(),
        };
        self.store
            .set_json(&session_key(did.as_str()), &session)
            .await?;
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(did.to_string(), session.clone());

        info!(did = %did, expires_at = session.expires_at, "authenticated");
        self.audit.record(
            events::SUCCESS,
            json!({ "did": did.as_str(), "expires_at": session.expires_at }),
            Some(did.as_str()),
        );
        Ok(session)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// The live session for `identifier`, checking memory then storage.
    ///
    /// An expired session is deleted and treated as absent.
    pub async fn session(&self, identifier: &str) -> Option<Session> {
        let now = now_millis();
        let cached = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identifier)
            .cloned();

        let session = match cached {
            Some(session) => session,
            None => match self.store.get_json::<Session>(&session_key(identifier)).await {
                Ok(Some(session)) => session,
                Ok(None) => return None,
                Err(e) => {
                    self.store_error("session", Some(identifier), &e);
                    return None;
                }
            },
        };

        if session.is_expired(now) {
            self.expire_session(identifier).await;
            return None;
        }

        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identifier.to_string(), session.clone());
        Some(session)
    }

    pub async fn is_authenticated(&self, identifier: &str) -> bool {
        self.session(identifier).await.is_some()
    }

    /// End the session for `identifier`. Idempotent.
    pub async fn logout(&self, identifier: &str) -> Result<(), AuthError> {
        let had_memory = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identifier)
            .is_some();
        let had_stored = match self.store.delete(&session_key(identifier)).await {
            Ok(had_stored) => had_stored,
            Err(e) => return Err(self.storage_failure("logout", Some(identifier), e)),
        };
        if had_memory || had_stored {
            info!(did = identifier, "logged out");
            self.audit
                .record(events::LOGOUT, json!({ "did": identifier }), Some(identifier));
        }
        Ok(())
    }

    /// Every unexpired persisted session.
    pub async fn active_sessions(&self) -> Result<Vec<Session>, AuthError> {
        self.stored_sessions()
            .await
            .map_err(|e| self.storage_failure("active_sessions", None, e))
    }

    async fn stored_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let now = now_millis();
        let mut sessions = Vec::new();
        for key in self.store.list(SESSION_PREFIX).await? {
            if let Some(session) = self.store.get_json::<Session>(&key).await? {
                if !session.is_expired(now) {
                    sessions.push(session);
                }
            }
        }
        Ok(sessions)
    }

    /// Drop expired challenges and sessions from memory and storage.
    ///
    /// Returns the number of records removed.
    pub async fn purge_expired(&self) -> Result<usize, AuthError> {
        let now = now_millis();
        self.limiter.purge_expired(now);
        let removed = self
            .purge_stored(now)
            .await
            .map_err(|e| self.storage_failure("purge_expired", None, e))?;

        self.challenges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, c| !c.is_expired(now));
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, s| !s.is_expired(now));

        debug!(removed, "purged expired challenges and sessions");
        Ok(removed)
    }

    async fn purge_stored(&self, now: i64) -> Result<usize, StoreError> {
        let mut removed = 0;
        for key in self.store.list(CHALLENGE_PREFIX).await? {
            if let Some(challenge) = self.store.get_json::<Challenge>(&key).await? {
                if challenge.is_expired(now) && self.store.delete(&key).await? {
                    removed += 1;
                }
            }
        }
        for key in self.store.list(SESSION_PREFIX).await? {
            if let Some(session) = self.store.get_json::<Session>(&key).await? {
                if session.is_expired(now) && self.store.delete(&key).await? {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn expire_session(&self, identifier: &str) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identifier);
        if let Err(e) = self.store.delete(&session_key(identifier)).await {
            self.store_error("expire_session", Some(identifier), &e);
        }
        debug!(did = identifier, "session expired");
        self.audit.record(
            events::SESSION_EXPIRED,
            json!({ "did": identifier }),
            Some(identifier),
        );
    }

    fn store_error(&self, operation: &str, identifier: Option<&str>, error: &StoreError) {
        warn!(did = identifier, operation, %error, "auth store failure");
        self.audit.record(
            events::STORE_ERROR,
            json!({ "did": identifier, "operation": operation, "cause": error.to_string() }),
            identifier,
        );
    }

    /// Audit a storage failure and reduce it to a kind-only error.
    fn storage_failure(
        &self,
        operation: &str,
        identifier: Option<&str>,
        error: StoreError,
    ) -> AuthError {
        self.store_error(operation, identifier, &error);
        AuthError::Store(error)
    }
}
