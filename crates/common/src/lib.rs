//! Common utilities and types shared by the gateway and every backend service.

#![warn(clippy::pedantic)]

/// Module for HTTP header names shared across the gateway boundary
pub mod headers;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (size limit, header parsing, key decoding)
pub mod jwt;
