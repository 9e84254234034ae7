//! JWT utilities shared by the gateway and backend services.
//!
//! This module provides:
//! - Size limit for DoS prevention
//! - Header parsing (algorithm and optional key ID) without signature checks
//! - Ed25519 public key decoding from PEM files and JWK `x` values
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Header parsing never verifies anything; the token MUST still be verified
//!   against a trusted key after the header has been read
//! - Error messages are generic to prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::parse_header;
//!
//! let header = parse_header(token)?;
//! let key = resolver.resolve(header.kid.as_deref()).await?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::Algorithm;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding or
/// cryptographic work. Typical tokens are 200-500 bytes; 8KB leaves room for
/// generous attribute claims.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while reading a JWT header.
///
/// Messages are intentionally generic. Details are logged at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid")]
    TokenTooLarge,

    /// Token format is invalid (not header.payload.signature, bad base64, bad JSON).
    #[error("The access token is invalid")]
    MalformedToken,
}

// =============================================================================
// Header
// =============================================================================

/// The parts of a JWT header needed to pick a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Signature algorithm claimed by the token.
    pub algorithm: Algorithm,

    /// Key ID, if the token names one. Empty strings are treated as absent.
    pub kid: Option<String>,
}

// =============================================================================
// Functions
// =============================================================================

/// Parse a JWT header without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - The token must have exactly three non-empty, dot-separated segments
/// - The returned `kid` may only be used for key lookup in a trusted source
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - Wrong structure, bad base64, invalid JSON or unknown `alg`
pub fn parse_header(token: &str) -> Result<TokenHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|part| part.is_empty()) {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header = jsonwebtoken::decode_header(token).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header");
        JwtValidationError::MalformedToken
    })?;

    Ok(TokenHeader {
        algorithm: header.alg,
        kid: header.kid.filter(|kid| !kid.is_empty()),
    })
}

/// Decode an Ed25519 public key from PEM format.
///
/// Strips PEM header/footer lines and blank lines, then decodes the base64
/// content. The result is the raw key accepted by
/// `jsonwebtoken::DecodingKey::from_ed_der`.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the base64 content cannot be decoded.
pub fn decode_ed25519_public_key_pem(pem: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let b64: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();

    base64::engine::general_purpose::STANDARD.decode(b64)
}

/// Decode an Ed25519 public key from a JWK `x` field (base64url, no padding).
///
/// # Errors
///
/// Returns `base64::DecodeError` if the base64url content cannot be decoded.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(x_b64url)
}

// =============================================================================
// Tests
// =============================================================================
