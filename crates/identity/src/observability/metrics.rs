//! Identity metrics.
//!
//! All metrics follow Prometheus naming conventions:
//! - `identity_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code:
//! - `result`: hit, miss (cache); success, malformed, key_unavailable, bad_signature (validation)
//! - `status`: success, error (key-set fetches)
//!
//! Key IDs and subjects are never used as labels.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record a key cache lookup.
///
/// Metric: `identity_key_cache_total`
/// Labels: `result`
pub fn record_key_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("identity_key_cache_total", "result" => result).increment(1);
}

/// Record a key-set fetch.
///
/// Metric: `identity_jwks_fetch_total`, `identity_jwks_fetch_duration_seconds`
/// Labels: `status`
pub fn record_key_fetch(status: &'static str, duration: Duration) {
    histogram!("identity_jwks_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
    counter!("identity_jwks_fetch_total", "status" => status).increment(1);
}

/// Record time spent waiting for the key-set fetch rate limit.
///
/// Metric: `identity_jwks_rate_limit_wait_seconds`
pub fn record_rate_limit_wait(duration: Duration) {
    histogram!("identity_jwks_rate_limit_wait_seconds").record(duration.as_secs_f64());
}

/// Record a token validation outcome.
///
/// Metric: `identity_token_validations_total`, `identity_token_validation_duration_seconds`
/// Labels: `result`
pub fn record_token_validation(result: &'static str, duration: Duration) {
    histogram!("identity_token_validation_duration_seconds", "result" => result)
        .record(duration.as_secs_f64());
    counter!("identity_token_validations_total", "result" => result).increment(1);
}
