//! Federated Gateway Library
//!
//! The gateway sits in front of several backend services. For every client
//! request it captures the client's credential once and forwards it, as the
//! `jwt` header, on every backend call made for that request. It never
//! validates the credential; backend services do, with the `identity` crate.
//!
//! # Architecture
//!
//! ```text
//! routes.rs -> context.rs (capture) -> handlers/forward.rs -> backend.rs -> propagation.rs
//! ```
//!
//! # Modules
//!
//! - `backend` - Backend service trait and HTTP implementation
//! - `config` - Gateway configuration from environment
//! - `context` - Per-request credential context and capture middleware
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `observability` - Metrics
//! - `propagation` - Outbound `jwt` header handling
//! - `routes` - Axum router setup

pub mod backend;
pub mod config;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod observability;
pub mod propagation;
pub mod routes;
