//! Observability for identity validation.
//!
//! - `metrics` - Prometheus-style counters and histograms recorded through
//!   the `metrics` facade. The hosting service installs the exporter.

pub mod metrics;
