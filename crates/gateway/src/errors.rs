//! Gateway error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Messages
//! returned to clients are generic; the underlying detail is logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Gateway error type.
///
/// Maps to HTTP status codes:
/// - UnknownService: 404 Not Found
/// - Upstream: 502 Bad Gateway
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Backend service '{service}' failed: {reason}")]
    Upstream { service: String, reason: String },

    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::UnknownService(_) => 404,
            GatewayError::Upstream { .. } => 502,
            GatewayError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::UnknownService(name) => (
                StatusCode::NOT_FOUND,
                "UNKNOWN_SERVICE",
                format!("No backend service named '{name}'"),
            ),
            GatewayError::Upstream { service, reason } => {
                tracing::warn!(target: "gateway.backend", service = %service, reason = %reason, "Backend call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "BAD_GATEWAY",
                    "Backend service is unavailable".to_string(),
                )
            }
            GatewayError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::UnknownService("x".to_string()).status_code(), 404);
        assert_eq!(
            GatewayError::Upstream {
                service: "users".to_string(),
                reason: "connection refused".to_string()
            }
            .status_code(),
            502
        );
        assert_eq!(GatewayError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_upstream_response_hides_reason() {
        let response = GatewayError::Upstream {
            service: "users".to_string(),
            reason: "connect error: 10.0.0.5:4001".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "BAD_GATEWAY");
        assert!(!body.to_string().contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_unknown_service_names_service() {
        let response = GatewayError::UnknownService("billing".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "UNKNOWN_SERVICE");
        assert!(body["error"]["message"].as_str().unwrap().contains("billing"));
    }
}
