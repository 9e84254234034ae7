//! Signing key resolution.
//!
//! A [`SigningKeyResolver`] turns the key ID found in a token header into the
//! key that verifies the token. Two implementations exist, picked once at
//! startup from [`KeyMode`](crate::config::KeyMode):
//!
//! - [`StaticKeyResolver`] - development; one key loaded from a local file
//! - [`RemoteCachedResolver`] - production; keys fetched from a JWKS endpoint,
//!   cached by key ID, with a process-wide fetch rate limit

pub mod rate_limit;
pub mod remote;
pub mod static_key;

pub use rate_limit::{Clock, FetchRateLimiter, TokioClock};
pub use remote::{HttpKeySetSource, Jwk, JwksResponse, KeySetSource, RemoteCachedResolver};
pub use static_key::StaticKeyResolver;

use crate::config::{IdentityConfig, KeyMode};
use crate::errors::{KeyResolutionError, ResolverInitError};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use std::fmt;
use std::sync::Arc;

/// Public key material able to verify token signatures.
#[derive(Clone)]
pub struct SigningKey {
    kid: Option<String>,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    pub fn new(kid: Option<String>, algorithm: Algorithm, decoding_key: DecodingKey) -> Self {
        Self {
            kid,
            algorithm,
            decoding_key,
        }
    }

    /// Key ID this key was published under (`None` for the local key).
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// The only algorithm tokens verified with this key may use.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// Produces the key for a token's key ID.
#[async_trait]
pub trait SigningKeyResolver: Send + Sync {
    /// Resolve the key for `kid`.
    ///
    /// # Errors
    ///
    /// - `MissingLocalKey` - development mode without a loaded key
    /// - `RemoteFetchFailed` - production mode and the key set could not
    ///   supply the key
    async fn resolve(&self, kid: Option<&str>) -> Result<SigningKey, KeyResolutionError>;
}

/// Build the resolver for the configured mode.
///
/// Called once at startup. Development mode reads the local key file now;
/// a failed read is logged and every later resolution fails with
/// `MissingLocalKey`.
///
/// # Errors
///
/// Returns `ResolverInitError` if production mode cannot build its HTTP
/// client. There is no fallback to a client without the fetch timeout.
pub fn build_resolver(
    config: &IdentityConfig,
) -> Result<Arc<dyn SigningKeyResolver>, ResolverInitError> {
    match &config.mode {
        KeyMode::Development {
            local_key_path,
            local_key_algorithm,
        } => {
            tracing::info!(
                target: "identity.keys",
                path = %local_key_path.display(),
                algorithm = ?local_key_algorithm,
                "Using local signing key (development mode)"
            );
            Ok(Arc::new(StaticKeyResolver::load(
                local_key_path,
                *local_key_algorithm,
            )))
        }
        KeyMode::Production(remote) => {
            tracing::info!(
                target: "identity.keys",
                jwks_url = %remote.jwks_url,
                requests_per_minute = remote.requests_per_minute,
                "Using remote key set (production mode)"
            );
            let source = Arc::new(HttpKeySetSource::new(
                remote.jwks_url.clone(),
                remote.fetch_timeout,
            )?);
            Ok(Arc::new(RemoteCachedResolver::new(
                source,
                remote.cache_settings(),
                Arc::new(TokioClock),
            )))
        }
    }
}
