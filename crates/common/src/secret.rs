//! Secret types for protecting bearer tokens from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for credentials that cross the
//! gateway. A client's bearer token is held as a [`SecretString`] for the
//! whole request, so a `Debug` derive or a `tracing` field on any struct that
//! carries it prints `[REDACTED]` instead of the token.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct OutboundCall {
//!     service: String,
//!     token: SecretString,
//! }
//!
//! let call = OutboundCall {
//!     service: "posts".to_string(),
//!     token: SecretString::from("abc.def.ghi"),
//! };
//!
//! assert!(!format!("{call:?}").contains("abc.def.ghi"));
//!
//! // Writing the header requires an explicit expose_secret()
//! let value: &str = call.token.expose_secret();
//! assert_eq!(value, "abc.def.ghi");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
