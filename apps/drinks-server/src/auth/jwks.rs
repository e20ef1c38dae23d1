// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Cache policy
//!
//! - The key set is fetched on first use and kept for the process lifetime,
//!   unless a refresh interval (TTL) is configured
//! - Concurrent callers share a single in-flight fetch
//! - A token naming an unknown `kid` triggers at most one refetch per
//!   minimum refresh interval
//! - A failed refetch keeps serving the previous set
//!
//! ## Security
//!
//! - The remote source only speaks HTTPS
//! - Only asymmetric keys (RSA, EC, Ed25519) with a `kid` are loaded; each key
//!   is pinned to a single algorithm

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{
    AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse,
};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::error::AuthError;

/// Timeout for a single JWKS request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default minimum time between refetches caused by unknown key IDs.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Where signing keys come from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Key set published by the token issuer at an HTTPS endpoint.
pub struct RemoteKeySet {
    url: String,
    client: reqwest::Client,
}

impl RemoteKeySet {
    /// Create a source for `url` (e.g. `https://tenant.auth0.com/.well-known/jwks.json`).
    pub fn new(url: impl Into<String>) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .https_only(true)
            .build()
            .map_err(|e| AuthError::KeySetUnavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl KeySetSource for RemoteKeySet {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeySetUnavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))
    }
}

/// A verification key pinned to the one algorithm it may verify.
#[derive(Clone)]
pub struct VerificationKey {
    pub kid: String,
    pub algorithm: Algorithm,
    pub decoding_key: DecodingKey,
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Usable keys of one fetched JWKS, by key ID.
#[derive(Default)]
pub struct SigningKeys {
    by_kid: HashMap<String, VerificationKey>,
}

impl SigningKeys {
    /// Load every usable key; skipped keys are logged.
    pub fn from_jwks(jwks: &JwkSet) -> Self {
        let mut by_kid = HashMap::new();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                warn!("Skipping JWKS key without kid");
                continue;
            };
            match jwk_to_decoding_key(jwk) {
                Ok((decoding_key, algorithm)) => {
                    by_kid.insert(
                        kid.clone(),
                        VerificationKey {
                            kid,
                            algorithm,
                            decoding_key,
                        },
                    );
                }
                Err(reason) => warn!(kid = %kid, reason, "Skipping JWKS key"),
            }
        }
        Self { by_kid }
    }

    pub fn get(&self, kid: &str) -> Option<&VerificationKey> {
        self.by_kid.get(kid)
    }
}

/// JWKS cache entry.
struct CacheEntry {
    keys: Arc<SigningKeys>,
    fetched_at: Instant,
}

/// Owned, thread-safe signing key cache.
pub struct JwksManager {
    source: Arc<dyn KeySetSource>,
    /// Refresh interval; `None` keeps the set for the process lifetime
    cache_ttl: Option<Duration>,
    min_refresh_interval: Duration,
    cache: RwLock<Option<CacheEntry>>,
    /// Held for the duration of every fetch
    fetch_lock: Mutex<()>,
}

impl JwksManager {
    pub fn new(source: Arc<dyn KeySetSource>) -> Self {
        Self {
            source,
            cache_ttl: None,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            cache: RwLock::new(None),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Manager backed by the HTTPS endpoint at `jwks_url`.
    pub fn remote(jwks_url: impl Into<String>) -> Result<Self, AuthError> {
        Ok(Self::new(Arc::new(RemoteKeySet::new(jwks_url)?)))
    }

    /// Refetch the set once it is older than `ttl`.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Look up the key for `kid`, refetching once if it is unknown.
    pub async fn decoding_key(&self, kid: &str) -> Result<VerificationKey, AuthError> {
        let keys = self.current().await?;
        if let Some(key) = keys.get(kid) {
            return Ok(key.clone());
        }

        let keys = self.refresh_after_miss(&keys).await;
        keys.get(kid).cloned().ok_or(AuthError::UnknownKey)
    }

    /// Force refresh the JWKS cache.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let _fetching = self.fetch_lock.lock().await;
        self.fetch_and_store().await.map(|_| ())
    }

    /// Check if a key set is currently cached and within its TTL.
    pub async fn is_cached(&self) -> bool {
        self.fresh_keys().await.is_some()
    }

    async fn fresh_keys(&self) -> Option<Arc<SigningKeys>> {
        let cache = self.cache.read().await;
        let entry = cache.as_ref()?;
        match self.cache_ttl {
            Some(ttl) if entry.fetched_at.elapsed() >= ttl => None,
            _ => Some(entry.keys.clone()),
        }
    }

    /// The cached set, fetching it (single-flight) when absent or stale.
    async fn current(&self) -> Result<Arc<SigningKeys>, AuthError> {
        if let Some(keys) = self.fresh_keys().await {
            return Ok(keys);
        }

        let _fetching = self.fetch_lock.lock().await;
        // Whoever held the lock before us may have filled the cache.
        if let Some(keys) = self.fresh_keys().await {
            return Ok(keys);
        }

        match self.fetch_and_store().await {
            Ok(keys) => Ok(keys),
            Err(error) => {
                let mut cache = self.cache.write().await;
                match cache.as_mut() {
                    Some(stale) => {
                        warn!(%error, "JWKS refresh failed, serving stale key set");
                        // Back off for another TTL before retrying.
                        stale.fetched_at = Instant::now();
                        Ok(stale.keys.clone())
                    }
                    None => Err(error),
                }
            }
        }
    }

    /// Refetch after a kid miss against `seen`, unless another caller already
    /// replaced it or it was fetched (or last retried) within the minimum
    /// refresh interval.
    async fn refresh_after_miss(&self, seen: &Arc<SigningKeys>) -> Arc<SigningKeys> {
        let _fetching = self.fetch_lock.lock().await;
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.as_ref() {
                if !Arc::ptr_eq(&entry.keys, seen)
                    || entry.fetched_at.elapsed() < self.min_refresh_interval
                {
                    return entry.keys.clone();
                }
            }
        }

        match self.fetch_and_store().await {
            Ok(keys) => keys,
            Err(error) => {
                warn!(%error, "JWKS refresh for unknown kid failed");
                let mut cache = self.cache.write().await;
                if let Some(entry) = cache.as_mut() {
                    // Count the failed attempt against the refresh interval.
                    entry.fetched_at = Instant::now();
                }
                seen.clone()
            }
        }
    }

    /// Fetch from the source and replace the cache. Caller holds `fetch_lock`.
    async fn fetch_and_store(&self) -> Result<Arc<SigningKeys>, AuthError> {
        let jwks = self.source.fetch().await?;
        let keys = Arc::new(SigningKeys::from_jwks(&jwks));
        info!(keys = keys.by_kid.len(), "Fetched signing key set");

        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }
}

/// Convert a JWK to a DecodingKey and the single algorithm it verifies.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), &'static str> {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return Err("key is for encryption");
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let alg = match jwk.common.key_algorithm {
                None | Some(KeyAlgorithm::RS256) => Algorithm::RS256,
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                Some(KeyAlgorithm::PS256) => Algorithm::PS256,
                Some(KeyAlgorithm::PS384) => Algorithm::PS384,
                Some(KeyAlgorithm::PS512) => Algorithm::PS512,
                Some(_) => return Err("algorithm does not fit an RSA key"),
            };
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|_| "invalid RSA components")?;
            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let alg = match (&ec.curve, jwk.common.key_algorithm) {
                (EllipticCurve::P256, None | Some(KeyAlgorithm::ES256)) => Algorithm::ES256,
                (EllipticCurve::P384, None | Some(KeyAlgorithm::ES384)) => Algorithm::ES384,
                _ => return Err("unsupported curve or algorithm for EC key"),
            };
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|_| "invalid EC components")?;
            Ok((key, alg))
        }
        AlgorithmParameters::OctetKeyPair(okp) => {
            if !matches!(
                (&okp.curve, jwk.common.key_algorithm),
                (EllipticCurve::Ed25519, None | Some(KeyAlgorithm::EdDSA))
            ) {
                return Err("unsupported curve or algorithm for OKP key");
            }
            let key =
                DecodingKey::from_ed_components(&okp.x).map_err(|_| "invalid Ed25519 key")?;
            Ok((key, Algorithm::EdDSA))
        }
        _ => Err("symmetric or unsupported key type"),
    }
}
