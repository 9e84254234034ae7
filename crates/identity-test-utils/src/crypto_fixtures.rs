//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 keypairs that can sign tokens and publish
//! themselves as a JWK or a PEM file. All fixtures are deterministic based on
//! seed values.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use identity::keys::{Jwk, SigningKey, StaticKeyResolver};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde::Serialize;
use std::sync::Arc;

/// SubjectPublicKeyInfo prefix for an Ed25519 public key (RFC 8410).
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Deterministic Ed25519 keypair used to sign test tokens.
///
/// # Example
/// ```rust,ignore
/// let keypair = TestKeypair::new(1, "key-1");
/// let token = keypair.sign_token(&json!({"sub": "alice"}));
/// ```
pub struct TestKeypair {
    kid: String,
    public_key_bytes: Vec<u8>,
    private_key_pkcs8: Vec<u8>,
}

impl TestKeypair {
    /// Same seed, same key. `kid` is written into every token header.
    pub fn new(seed: u8, kid: &str) -> Self {
        let seed_bytes = seed_bytes(seed);

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .expect("Failed to create test keypair");

        Self {
            kid: kid.to_string(),
            public_key_bytes: key_pair.public_key().as_ref().to_vec(),
            private_key_pkcs8: build_pkcs8_from_seed(&seed_bytes),
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Sign `claims` with EdDSA, naming this keypair's kid in the header.
    pub fn sign_token<T: Serialize>(&self, claims: &T) -> String {
        self.sign_with_header(claims, Some(self.kid.clone()))
    }

    /// Sign `claims` with no `kid` in the header.
    pub fn sign_token_without_kid<T: Serialize>(&self, claims: &T) -> String {
        self.sign_with_header(claims, None)
    }

    fn sign_with_header<T: Serialize>(&self, claims: &T, kid: Option<String>) -> String {
        let encoding_key = EncodingKey::from_ed_der(&self.private_key_pkcs8);
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());
        header.kid = kid;

        encode(&header, claims, &encoding_key).expect("Failed to sign token")
    }

    /// Public key as a JWKS entry.
    pub fn jwk_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kty": "OKP",
            "kid": self.kid,
            "crv": "Ed25519",
            "x": URL_SAFE_NO_PAD.encode(&self.public_key_bytes),
            "alg": "EdDSA",
            "use": "sig"
        })
    }

    /// Public key as a typed [`Jwk`].
    pub fn jwk(&self) -> Jwk {
        serde_json::from_value(self.jwk_json()).expect("Failed to build JWK")
    }

    /// Public key in standard SPKI PEM form.
    pub fn public_key_pem(&self) -> String {
        let mut spki = ED25519_SPKI_PREFIX.to_vec();
        spki.extend_from_slice(&self.public_key_bytes);
        format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----\n",
            STANDARD.encode(spki)
        )
    }

    /// Public key as bare base64 inside PEM armor.
    pub fn raw_public_key_pem(&self) -> String {
        format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----\n",
            STANDARD.encode(&self.public_key_bytes)
        )
    }

    /// Verification key for this keypair.
    pub fn signing_key(&self) -> SigningKey {
        self.jwk().to_signing_key().expect("Failed to build signing key")
    }

    /// Development-mode resolver holding this keypair's public key.
    pub fn static_resolver(&self) -> Arc<StaticKeyResolver> {
        Arc::new(StaticKeyResolver::new(self.signing_key()))
    }
}

/// Expand a one-byte seed into a deterministic 32-byte Ed25519 seed.
fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    seed_bytes
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// This is a test-only utility. ring does not expose PKCS#8 for a keypair
/// created from a seed, so the DER is assembled by hand.
pub fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::with_capacity(48);

    // Outer SEQUENCE, 46 bytes
    pkcs8.extend_from_slice(&[0x30, 0x2e]);

    // Version: INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);

    // AlgorithmIdentifier: SEQUENCE { OID 1.3.101.112 }
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);

    // PrivateKey: OCTET STRING wrapping OCTET STRING with the seed
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_is_deterministic() {
        let a = TestKeypair::new(1, "k");
        let b = TestKeypair::new(1, "k");

        assert_eq!(a.public_key_pem(), b.public_key_pem());
        assert_eq!(a.private_key_pkcs8, b.private_key_pkcs8);
    }

    #[test]
    fn test_different_seeds_produce_different_keys() {
        let a = TestKeypair::new(1, "k");
        let b = TestKeypair::new(2, "k");

        assert_ne!(a.public_key_bytes, b.public_key_bytes);
    }

    #[test]
    fn test_pkcs8_is_48_bytes() {
        assert_eq!(build_pkcs8_from_seed(&[7u8; 32]).len(), 48);
    }

    #[test]
    fn test_signed_token_names_kid() {
        let keypair = TestKeypair::new(3, "key-3");
        let token = keypair.sign_token(&serde_json::json!({"sub": "alice"}));

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("key-3"));
        assert_eq!(header.alg, Algorithm::EdDSA);
    }
}
