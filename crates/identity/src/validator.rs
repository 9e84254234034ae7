//! Bearer token validation.
//!
//! Validates tokens against the key chosen by a [`SigningKeyResolver`] and
//! turns the verified claims into an [`Identity`].
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - A signature segment that is not base64url is a bad signature, not a
//!   malformed token
//! - The token must use exactly the algorithm of the resolved key
//! - Expiration is NOT checked: an expired token with a valid signature is
//!   accepted. Existing issuers rely on this; it is a known risk and is
//!   recorded as an open question in DESIGN.md
//! - Audience is not checked; unknown claims pass through as attributes

use crate::errors::ValidationError;
use crate::identity::Identity;
use crate::keys::{SigningKey, SigningKeyResolver};
use crate::observability::metrics;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::jwt::parse_header;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Validation};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Token validator bound to one resolver for the life of the process.
#[derive(Clone)]
pub struct TokenValidator {
    resolver: Arc<dyn SigningKeyResolver>,
}

impl TokenValidator {
    pub fn new(resolver: Arc<dyn SigningKeyResolver>) -> Self {
        Self { resolver }
    }

    /// Validate a raw bearer token and return the caller's identity.
    ///
    /// # Checks
    ///
    /// 1. Size and structure (header.payload.signature)
    /// 2. Key resolution by the header's `kid`
    /// 3. Signature, with the key's algorithm
    /// 4. Claims decode into an identity with a string `sub`
    ///
    /// # Errors
    ///
    /// - `Malformed` - unparseable token or unusable claims
    /// - `KeyUnavailable` - the resolver could not supply a key
    /// - `BadSignature` - signature or algorithm mismatch
    #[instrument(skip_all, name = "identity.validate")]
    pub async fn validate(&self, token: &str) -> Result<Identity, ValidationError> {
        let started = Instant::now();
        let result = self.validate_inner(token).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::record_token_validation(outcome, started.elapsed());

        result
    }

    async fn validate_inner(&self, token: &str) -> Result<Identity, ValidationError> {
        // 1. Parse header (includes size check via common::jwt)
        let header = parse_header(token).map_err(|e| {
            tracing::debug!(target: "identity.jwt", error = ?e, "Token header parsing failed");
            ValidationError::Malformed
        })?;

        // Segments must be base64url before a key is worth resolving
        check_segment_encoding(token)?;

        // 2. Resolve the verification key
        let key = self
            .resolver
            .resolve(header.kid.as_deref())
            .await
            .map_err(|e| {
                tracing::warn!(target: "identity.jwt", kid = ?header.kid, error = %e, "Signing key unavailable");
                ValidationError::KeyUnavailable(e)
            })?;

        if header.algorithm != key.algorithm() {
            tracing::debug!(
                target: "identity.jwt",
                token_alg = ?header.algorithm,
                key_alg = ?key.algorithm(),
                "Token algorithm does not match signing key"
            );
            return Err(ValidationError::BadSignature);
        }

        // 3 + 4. Verify signature and decode claims
        let identity = verify_token(token, &key)?;

        tracing::debug!(target: "identity.jwt", "Token validated successfully");
        Ok(identity)
    }
}

/// Decode the payload and signature segments.
///
/// An undecodable payload is `Malformed`. An undecodable signature is a
/// tampered signature and is `BadSignature`.
fn check_segment_encoding(token: &str) -> Result<(), ValidationError> {
    let mut segments = token.splitn(3, '.').skip(1);
    let (Some(payload), Some(signature)) = (segments.next(), segments.next()) else {
        return Err(ValidationError::Malformed);
    };

    URL_SAFE_NO_PAD.decode(payload).map_err(|e| {
        tracing::debug!(target: "identity.jwt", error = %e, "Token payload is not base64url");
        ValidationError::Malformed
    })?;

    URL_SAFE_NO_PAD.decode(signature).map_err(|e| {
        tracing::debug!(target: "identity.jwt", error = %e, "Token signature is not base64url");
        ValidationError::BadSignature
    })?;

    Ok(())
}

/// Validation rules: signature only; no time-based or audience claims.
fn validation_for(key: &SigningKey) -> Validation {
    let mut validation = Validation::new(key.algorithm());
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation
}

/// Verify the token signature and extract the identity.
fn verify_token(token: &str, key: &SigningKey) -> Result<Identity, ValidationError> {
    let validation = validation_for(key);

    let token_data = decode::<Identity>(token, key.decoding_key(), &validation).map_err(|e| {
        let mapped = match e.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::Crypto(_) => ValidationError::BadSignature,
            _ => ValidationError::Malformed,
        };
        tracing::debug!(target: "identity.jwt", error = %e, outcome = mapped.kind(), "Token verification failed");
        mapped
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::errors::KeyResolutionError;
    use crate::keys::StaticKeyResolver;
    use common::jwt::MAX_JWT_SIZE_BYTES;
    use jsonwebtoken::{Algorithm, DecodingKey};

    fn validator_with_unloaded_key() -> TokenValidator {
        TokenValidator::new(Arc::new(StaticKeyResolver::unloaded()))
    }

    fn validator_with_dummy_key() -> TokenValidator {
        let key = SigningKey::new(None, Algorithm::EdDSA, DecodingKey::from_ed_der(&[9u8; 32]));
        TokenValidator::new(Arc::new(StaticKeyResolver::new(key)))
    }

    fn unsigned_token(header: &str, payload: &str) -> String {
        format!(
            "{}.{}.ZmFrZV9zaWduYXR1cmU",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_validation_disables_expiry_and_audience() {
        let key = SigningKey::new(None, Algorithm::EdDSA, DecodingKey::from_ed_der(&[9u8; 32]));
        let validation = validation_for(&key);

        assert!(!validation.validate_exp);
        assert!(!validation.validate_nbf);
        assert!(!validation.validate_aud);
        assert!(validation.required_spec_claims.is_empty());
        assert_eq!(validation.algorithms, vec![Algorithm::EdDSA]);
    }

    #[tokio::test]
    async fn test_malformed_token_rejected_before_key_lookup() {
        // An unloaded resolver would yield KeyUnavailable if it were reached
        let validator = validator_with_unloaded_key();

        for token in ["", "not-a-jwt", "a.b", "a.b.c.d"] {
            assert_eq!(
                validator.validate(token).await,
                Err(ValidationError::Malformed),
                "token {token:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_oversized_token_is_malformed() {
        let validator = validator_with_unloaded_key();
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);

        assert_eq!(validator.validate(&token).await, Err(ValidationError::Malformed));
    }

    #[tokio::test]
    async fn test_missing_local_key_is_key_unavailable() {
        let validator = validator_with_unloaded_key();
        let token = unsigned_token(r#"{"alg":"EdDSA","kid":"k"}"#, r#"{"sub":"u"}"#);

        assert_eq!(
            validator.validate(&token).await,
            Err(ValidationError::KeyUnavailable(
                KeyResolutionError::MissingLocalKey
            ))
        );
    }

    #[tokio::test]
    async fn test_segment_encoding_checked_before_key_lookup() {
        let validator = validator_with_unloaded_key();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"EdDSA","kid":"k"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"u"}"#);

        assert_eq!(
            validator.validate(&format!("{header}.{payload}.c2ln*")).await,
            Err(ValidationError::BadSignature)
        );
        assert_eq!(
            validator.validate(&format!("{header}.e30*.c2ln")).await,
            Err(ValidationError::Malformed)
        );
    }

    #[tokio::test]
    async fn test_algorithm_mismatch_is_bad_signature() {
        let validator = validator_with_dummy_key();
        let token = unsigned_token(r#"{"alg":"RS256"}"#, r#"{"sub":"u"}"#);

        assert_eq!(
            validator.validate(&token).await,
            Err(ValidationError::BadSignature)
        );
    }

    #[tokio::test]
    async fn test_forged_signature_is_bad_signature() {
        let validator = validator_with_dummy_key();
        let token = unsigned_token(r#"{"alg":"EdDSA"}"#, r#"{"sub":"u","isAdmin":true}"#);

        assert_eq!(
            validator.validate(&token).await,
            Err(ValidationError::BadSignature)
        );
    }
}
