//! Observability for the gateway.
//!
//! - `metrics` - Prometheus recorder setup and metric helpers

pub mod metrics;
