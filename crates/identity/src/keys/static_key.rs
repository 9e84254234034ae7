//! Development-mode resolver backed by one local key.
//!
//! The key file is read exactly once, at construction. Every lookup returns
//! that key whatever key ID the token names.

use crate::errors::{KeyMaterialError, KeyResolutionError};
use crate::keys::{SigningKey, SigningKeyResolver};
use async_trait::async_trait;
use common::jwt::decode_ed25519_public_key_pem;
use jsonwebtoken::{Algorithm, DecodingKey};
use std::path::Path;

/// Length of a raw Ed25519 public key.
const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// Resolver that always returns the pre-loaded local key.
#[derive(Debug, Clone)]
pub struct StaticKeyResolver {
    key: Option<SigningKey>,
}

impl StaticKeyResolver {
    /// Resolver around an already-parsed key.
    pub fn new(key: SigningKey) -> Self {
        Self { key: Some(key) }
    }

    /// Resolver whose key failed to load. Every lookup fails.
    pub fn unloaded() -> Self {
        Self { key: None }
    }

    /// Read and parse the key file at `path`.
    ///
    /// Failures are logged, not returned: the process keeps serving and every
    /// token is rejected with `MissingLocalKey`.
    pub fn load(path: &Path, algorithm: Algorithm) -> Self {
        match read_key_file(path, algorithm) {
            Ok(key) => {
                tracing::info!(
                    target: "identity.keys.static",
                    path = %path.display(),
                    "Local signing key loaded"
                );
                Self::new(key)
            }
            Err(e) => {
                tracing::error!(
                    target: "identity.keys.static",
                    path = %path.display(),
                    error = %e,
                    "Failed to load local signing key; all tokens will be rejected"
                );
                Self::unloaded()
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.key.is_some()
    }
}

#[async_trait]
impl SigningKeyResolver for StaticKeyResolver {
    async fn resolve(&self, kid: Option<&str>) -> Result<SigningKey, KeyResolutionError> {
        match &self.key {
            Some(key) => {
                tracing::trace!(target: "identity.keys.static", kid = ?kid, "Returning local key");
                Ok(key.clone())
            }
            None => Err(KeyResolutionError::MissingLocalKey),
        }
    }
}

fn read_key_file(path: &Path, algorithm: Algorithm) -> Result<SigningKey, KeyMaterialError> {
    let pem = std::fs::read(path)?;
    parse_public_key_pem(&pem, algorithm)
}

/// Parse a PEM public key for `algorithm`.
///
/// EdDSA accepts either a standard SPKI PEM or the bare base64 32-byte key
/// wrapped in PEM armor. RSA and EC keys must be standard PEM.
pub fn parse_public_key_pem(
    pem: &[u8],
    algorithm: Algorithm,
) -> Result<SigningKey, KeyMaterialError> {
    let decoding_key = match algorithm {
        Algorithm::EdDSA => match DecodingKey::from_ed_pem(pem) {
            Ok(key) => key,
            Err(_) => {
                let text = std::str::from_utf8(pem)
                    .map_err(|e| KeyMaterialError::InvalidEncoding(e.to_string()))?;
                let raw = decode_ed25519_public_key_pem(text)
                    .map_err(|e| KeyMaterialError::InvalidEncoding(e.to_string()))?;
                if raw.len() != ED25519_PUBLIC_KEY_LEN {
                    return Err(KeyMaterialError::InvalidEncoding(format!(
                        "Ed25519 public key must be {ED25519_PUBLIC_KEY_LEN} bytes, got {}",
                        raw.len()
                    )));
                }
                DecodingKey::from_ed_der(&raw)
            }
        },
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem)
            .map_err(|e| KeyMaterialError::InvalidEncoding(e.to_string()))?,
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem)
            .map_err(|e| KeyMaterialError::InvalidEncoding(e.to_string()))?,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            return Err(KeyMaterialError::UnsupportedKeyType(format!(
                "{algorithm:?} is symmetric; a public key is required"
            )));
        }
    };

    Ok(SigningKey::new(None, algorithm, decoding_key))
}
