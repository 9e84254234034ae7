//! # Identity Test Utilities
//!
//! Shared test utilities for the identity library and the gateway.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed Ed25519 keys for reproducible tests)
//! - Claim builders (TestTokenBuilder)
//! - A manually advanced clock and an in-memory key-set source
//! - Server test harness (TestBackendServer for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use identity_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let keypair = TestKeypair::new(1, "key-1");
//!
//!     let token = keypair.sign_token(
//!         &TestTokenBuilder::new().for_user("alice").admin().build(),
//!     );
//!
//!     let server = TestBackendServer::spawn(keypair.static_resolver()).await?;
//! }
//! ```

pub mod clock;
pub mod crypto_fixtures;
pub mod key_sources;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use clock::*;
pub use crypto_fixtures::*;
pub use key_sources::*;
pub use server_harness::*;
pub use token_builders::*;
