//! Production-mode resolver backed by a remote JWKS endpoint.
//!
//! Keys are cached by key ID. A cache hit returns without touching the
//! network. A miss waits for the shared [`FetchRateLimiter`], fetches the key
//! set, and caches the requested key.
//!
//! # Security
//!
//! - Only asymmetric keys (OKP/Ed25519, RSA) are accepted from the key set
//! - HTTPS should be used in production (enforced by deployment config)
//! - Fetches time out, so a hanging endpoint cannot stall validations forever

use crate::errors::{KeyMaterialError, KeyResolutionError, ResolverInitError};
use crate::keys::rate_limit::{Clock, FetchRateLimiter};
use crate::keys::{SigningKey, SigningKeyResolver};
use crate::observability::metrics;
use async_trait::async_trait;
use common::jwt::decode_ed25519_public_key_jwk;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::instrument;

/// Default fetch budget per rolling minute.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 5;

/// Default cache TTL in seconds (10 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 600;

/// Default maximum number of cached keys.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 5;

/// Default timeout for a key-set fetch in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// JSON Web Key from a JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("OKP" or "RSA").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Curve name (OKP keys; must be "Ed25519").
    #[serde(default)]
    pub crv: Option<String>,

    /// Public key value (OKP keys, base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// Modulus (RSA keys, base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// Exponent (RSA keys, base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm; defaults by key type when absent.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

impl Jwk {
    /// Convert this JWK into a verification key.
    ///
    /// # Errors
    ///
    /// `UnsupportedKeyType` for non-signing or non-asymmetric keys,
    /// `InvalidEncoding` for missing or undecodable key parameters.
    pub fn to_signing_key(&self) -> Result<SigningKey, KeyMaterialError> {
        if let Some(key_use) = &self.key_use {
            if key_use != "sig" {
                return Err(KeyMaterialError::UnsupportedKeyType(format!(
                    "key use '{key_use}' is not 'sig'"
                )));
            }
        }

        let (algorithm, decoding_key) = match self.kty.as_str() {
            "OKP" => {
                if self.crv.as_deref().is_some_and(|crv| crv != "Ed25519") {
                    return Err(KeyMaterialError::UnsupportedKeyType(format!(
                        "OKP curve {:?}",
                        self.crv
                    )));
                }
                let algorithm = self.algorithm_or(Algorithm::EdDSA)?;
                if algorithm != Algorithm::EdDSA {
                    return Err(KeyMaterialError::UnsupportedKeyType(format!(
                        "OKP key with algorithm {algorithm:?}"
                    )));
                }
                let x = self.x.as_deref().ok_or_else(|| {
                    KeyMaterialError::InvalidEncoding("OKP key missing x".to_string())
                })?;
                let raw = decode_ed25519_public_key_jwk(x)
                    .map_err(|e| KeyMaterialError::InvalidEncoding(e.to_string()))?;
                (algorithm, DecodingKey::from_ed_der(&raw))
            }
            "RSA" => {
                let algorithm = self.algorithm_or(Algorithm::RS256)?;
                if !matches!(
                    algorithm,
                    Algorithm::RS256
                        | Algorithm::RS384
                        | Algorithm::RS512
                        | Algorithm::PS256
                        | Algorithm::PS384
                        | Algorithm::PS512
                ) {
                    return Err(KeyMaterialError::UnsupportedKeyType(format!(
                        "RSA key with algorithm {algorithm:?}"
                    )));
                }
                let (Some(n), Some(e)) = (self.n.as_deref(), self.e.as_deref()) else {
                    return Err(KeyMaterialError::InvalidEncoding(
                        "RSA key missing n or e".to_string(),
                    ));
                };
                let decoding_key = DecodingKey::from_rsa_components(n, e)
                    .map_err(|e| KeyMaterialError::InvalidEncoding(e.to_string()))?;
                (algorithm, decoding_key)
            }
            other => {
                return Err(KeyMaterialError::UnsupportedKeyType(other.to_string()));
            }
        };

        Ok(SigningKey::new(self.kid.clone(), algorithm, decoding_key))
    }

    fn algorithm_or(&self, default: Algorithm) -> Result<Algorithm, KeyMaterialError> {
        match &self.alg {
            Some(alg) => Algorithm::from_str(alg)
                .map_err(|_| KeyMaterialError::UnsupportedKeyType(format!("algorithm {alg}"))),
            None => Ok(default),
        }
    }
}

/// Where key-set documents come from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch the current key set.
    ///
    /// # Errors
    ///
    /// `RemoteFetchFailed` on network, status or decoding failures.
    async fn fetch(&self) -> Result<JwksResponse, KeyResolutionError>;
}

/// [`KeySetSource`] that GETs a JWKS document over HTTP(S).
pub struct HttpKeySetSource {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,
}

impl HttpKeySetSource {
    /// Create a source for `jwks_url` whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ResolverInitError::HttpClient` if the HTTP client cannot be
    /// built.
    pub fn new(jwks_url: String, timeout: Duration) -> Result<Self, ResolverInitError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!(target: "identity.keys.jwks", error = %e, "Failed to build JWKS HTTP client");
                ResolverInitError::HttpClient(e)
            })?;

        Ok(Self {
            jwks_url,
            http_client,
        })
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    async fn fetch(&self) -> Result<JwksResponse, KeyResolutionError> {
        tracing::debug!(target: "identity.keys.jwks", "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "identity.keys.jwks", error = %e, "Failed to fetch JWKS");
                KeyResolutionError::RemoteFetchFailed(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "identity.keys.jwks",
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(KeyResolutionError::RemoteFetchFailed(format!(
                "endpoint returned {status}"
            )));
        }

        response.json::<JwksResponse>().await.map_err(|e| {
            tracing::error!(target: "identity.keys.jwks", error = %e, "Failed to parse JWKS response");
            KeyResolutionError::RemoteFetchFailed(format!("invalid key set document: {e}"))
        })
    }
}

/// Cache and rate-limit settings for [`RemoteCachedResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Fetch budget per rolling minute, shared by all lookups.
    pub requests_per_minute: u32,

    /// How long a cached key is served before it is fetched again.
    pub ttl: Duration,

    /// Maximum cached keys; the oldest entry is evicted first.
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

struct CachedKey {
    key: SigningKey,
    inserted_at: Instant,
}

/// Resolver that fetches keys from a [`KeySetSource`] and caches them by ID.
///
/// Concurrent misses on the same key ID may each fetch; every fetch still
/// goes through the shared limiter.
pub struct RemoteCachedResolver {
    source: Arc<dyn KeySetSource>,
    limiter: FetchRateLimiter,
    clock: Arc<dyn Clock>,
    cache: RwLock<HashMap<String, CachedKey>>,
    settings: CacheSettings,
}

impl RemoteCachedResolver {
    pub fn new(
        source: Arc<dyn KeySetSource>,
        settings: CacheSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            limiter: FetchRateLimiter::per_minute(settings.requests_per_minute, Arc::clone(&clock)),
            clock,
            cache: RwLock::new(HashMap::new()),
            settings,
        }
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    /// Number of keys currently cached, expired entries included.
    pub async fn cached_keys(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Drop every cached key.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    async fn cached(&self, kid: &str) -> Option<SigningKey> {
        let cache = self.cache.read().await;
        let entry = cache.get(kid)?;
        if self.clock.now().saturating_duration_since(entry.inserted_at) < self.settings.ttl {
            Some(entry.key.clone())
        } else {
            None
        }
    }

    async fn store(&self, kid: &str, key: SigningKey) {
        let now = self.clock.now();
        let mut cache = self.cache.write().await;

        cache.retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < self.settings.ttl);

        while cache.len() >= self.settings.max_entries.max(1) && !cache.contains_key(kid) {
            let oldest = cache
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(oldest_kid, _)| oldest_kid.clone());
            match oldest {
                Some(oldest_kid) => {
                    tracing::debug!(target: "identity.keys.jwks", evicted_kid = %oldest_kid, "Evicting oldest cached key");
                    cache.remove(&oldest_kid);
                }
                None => break,
            }
        }

        cache.insert(
            kid.to_string(),
            CachedKey {
                key,
                inserted_at: now,
            },
        );
    }

    async fn fetch_key(&self, kid: &str) -> Result<SigningKey, KeyResolutionError> {
        let waited = self.limiter.acquire().await;
        if !waited.is_zero() {
            metrics::record_rate_limit_wait(waited);
        }

        let started = self.clock.now();
        let result = self.source.fetch().await;
        let elapsed = self.clock.now().saturating_duration_since(started);

        let jwks = match result {
            Ok(jwks) => {
                metrics::record_key_fetch("success", elapsed);
                jwks
            }
            Err(e) => {
                metrics::record_key_fetch("error", elapsed);
                return Err(e);
            }
        };

        let jwk = jwks
            .keys
            .iter()
            .find(|jwk| jwk.kid.as_deref() == Some(kid))
            .ok_or_else(|| {
                tracing::warn!(target: "identity.keys.jwks", kid = %kid, "Key not found in JWKS");
                KeyResolutionError::RemoteFetchFailed(format!(
                    "no signing key found for kid '{kid}'"
                ))
            })?;

        jwk.to_signing_key().map_err(|e| {
            tracing::warn!(target: "identity.keys.jwks", kid = %kid, error = %e, "Unusable JWK");
            KeyResolutionError::RemoteFetchFailed(format!("unusable key '{kid}': {e}"))
        })
    }
}

#[async_trait]
impl SigningKeyResolver for RemoteCachedResolver {
    #[instrument(skip(self), fields(kid = ?kid))]
    async fn resolve(&self, kid: Option<&str>) -> Result<SigningKey, KeyResolutionError> {
        let Some(kid) = kid else {
            tracing::debug!(target: "identity.keys.jwks", "Token header has no key ID");
            return Err(KeyResolutionError::RemoteFetchFailed(
                "token header has no key id".to_string(),
            ));
        };

        if let Some(key) = self.cached(kid).await {
            tracing::debug!(target: "identity.keys.jwks", kid = %kid, "JWKS cache hit");
            metrics::record_key_cache(true);
            return Ok(key);
        }
        metrics::record_key_cache(false);

        let key = self.fetch_key(kid).await?;
        self.store(kid, key.clone()).await;

        tracing::info!(target: "identity.keys.jwks", kid = %kid, "Signing key fetched and cached");
        Ok(key)
    }
}
