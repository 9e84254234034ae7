//! Identity Validation Library
//!
//! Shared by every backend service behind the federated gateway. Validates
//! the signed token the gateway forwards in the `jwt` header and exposes the
//! caller's [`Identity`] to request handlers.
//!
//! # Architecture
//!
//! ```text
//! middleware.rs -> validator.rs -> keys/ (static | remote + rate_limit)
//! ```
//!
//! # Modules
//!
//! - `authorization` - Attribute checks for handlers
//! - `config` - Key mode configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `identity` - The validated caller identity
//! - `keys` - Signing key resolution (local key or cached JWKS)
//! - `middleware` - Axum authentication middleware
//! - `observability` - Metrics
//! - `validator` - Token validation

pub mod authorization;
pub mod config;
pub mod errors;
pub mod identity;
pub mod keys;
pub mod middleware;
pub mod observability;
pub mod validator;

pub use authorization::{require_attributes, AuthorizationError};
pub use config::IdentityConfig;
pub use errors::{KeyResolutionError, ResolverInitError, ValidationError};
pub use identity::Identity;
pub use keys::{build_resolver, SigningKey, SigningKeyResolver};
pub use middleware::{authenticate, with_authentication, AuthState, CallerIdentity, IdentityExt};
pub use validator::TokenValidator;
