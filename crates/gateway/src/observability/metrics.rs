//! Metrics definitions for the gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gateway_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `service`: configured backend names only (unknown names never reach a
//!   backend call)
//! - `status`: success, client_error, server_error, error
//! - `credential`: present, absent

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("gateway_backend_call".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.500, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set backend call buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record a backend call.
///
/// Metric: `gateway_backend_calls_total`, `gateway_backend_call_duration_seconds`
/// Labels: `service`, `status`
pub fn record_backend_call(service: &str, status: &'static str, duration: Duration) {
    histogram!("gateway_backend_call_duration_seconds",
        "service" => service.to_string(),
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("gateway_backend_calls_total",
        "service" => service.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record whether a forwarded client request carried a credential.
///
/// Metric: `gateway_forwarded_requests_total`
/// Labels: `credential`
pub fn record_forwarded_request(has_credential: bool) {
    let credential = if has_credential { "present" } else { "absent" };
    counter!("gateway_forwarded_requests_total", "credential" => credential).increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

    fn counter_value(snapshotter: &Snapshotter, name: &str, label: (&str, &str)) -> Option<u64> {
        snapshotter.snapshot().into_vec().into_iter().find_map(|(key, _, _, value)| {
            let key = key.key();
            let label_matches = key.labels().any(|l| l.key() == label.0 && l.value() == label.1);
            match value {
                DebugValue::Counter(count) if key.name() == name && label_matches => Some(count),
                _ => None,
            }
        })
    }

    #[test]
    fn test_record_backend_call() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_backend_call("users", "success", Duration::from_millis(12));
            record_backend_call("users", "success", Duration::from_millis(8));
        });

        assert_eq!(
            counter_value(&snapshotter, "gateway_backend_calls_total", ("service", "users")),
            Some(2)
        );
    }

    #[test]
    fn test_record_forwarded_request() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_forwarded_request(true);
            record_forwarded_request(false);
            record_forwarded_request(false);
        });

        assert_eq!(
            counter_value(&snapshotter, "gateway_forwarded_requests_total", ("credential", "absent")),
            Some(2)
        );
        assert_eq!(
            counter_value(&snapshotter, "gateway_forwarded_requests_total", ("credential", "present")),
            Some(1)
        );
    }
}
