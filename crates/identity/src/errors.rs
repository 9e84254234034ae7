//! Identity error types.
//!
//! Key resolution failures propagate into token validation failures, and
//! validation failures map to HTTP status codes via the `IntoResponse` impl.
//! Messages returned to clients are intentionally generic; the underlying
//! detail is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure to produce signing key material for a token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyResolutionError {
    /// Development mode, but the local key was not loaded at startup.
    #[error("local signing key is not loaded")]
    MissingLocalKey,

    /// Production mode, and the key-set endpoint could not supply the key
    /// (network error, endpoint error, unknown key ID).
    #[error("remote key fetch failed: {0}")]
    RemoteFetchFailed(String),
}

/// Failure to set up a resolver at startup.
#[derive(Debug, Error)]
pub enum ResolverInitError {
    #[error("failed to build JWKS HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Failure to turn key material (PEM file, JWK) into a verification key.
#[derive(Debug, Error)]
pub enum KeyMaterialError {
    #[error("failed to read key file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key encoding: {0}")]
    InvalidEncoding(String),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),
}

/// Token validation failure.
///
/// Maps to HTTP status codes:
/// - Malformed, BadSignature: 401 Unauthorized
/// - KeyUnavailable: 503 Service Unavailable
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Token could not be parsed into header/payload/signature, or its
    /// verified payload is not a usable set of claims.
    #[error("The access token is invalid")]
    Malformed,

    /// No key could be resolved to verify the token.
    #[error("Signing key unavailable: {0}")]
    KeyUnavailable(#[from] KeyResolutionError),

    /// Signature does not verify against the resolved key.
    #[error("The access token is invalid")]
    BadSignature,
}

impl ValidationError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ValidationError::Malformed | ValidationError::BadSignature => 401,
            ValidationError::KeyUnavailable(_) => 503,
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::Malformed => "malformed",
            ValidationError::KeyUnavailable(_) => "key_unavailable",
            ValidationError::BadSignature => "bad_signature",
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

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ValidationError::Malformed | ValidationError::BadSignature => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "The access token is invalid".to_string(),
            ),
            ValidationError::KeyUnavailable(reason) => {
                tracing::warn!(target: "identity.availability", reason = %reason, "Signing key unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer error=\"invalid_token\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
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
    fn test_key_resolution_error_converts_to_key_unavailable() {
        let err: ValidationError = KeyResolutionError::MissingLocalKey.into();
        assert_eq!(
            err,
            ValidationError::KeyUnavailable(KeyResolutionError::MissingLocalKey)
        );
    }

    #[test]
    fn test_display_does_not_leak_detail_for_client_errors() {
        assert_eq!(
            ValidationError::Malformed.to_string(),
            "The access token is invalid"
        );
        assert_eq!(
            ValidationError::BadSignature.to_string(),
            "The access token is invalid"
        );
    }

    #[test]
    fn test_display_remote_fetch_failed() {
        let err = KeyResolutionError::RemoteFetchFailed("timeout".to_string());
        assert_eq!(err.to_string(), "remote key fetch failed: timeout");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ValidationError::Malformed.status_code(), 401);
        assert_eq!(ValidationError::BadSignature.status_code(), 401);
        assert_eq!(
            ValidationError::KeyUnavailable(KeyResolutionError::MissingLocalKey).status_code(),
            503
        );
    }

    #[tokio::test]
    async fn test_bad_signature_response() {
        let response = ValidationError::BadSignature.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("WWW-Authenticate").unwrap(),
            "Bearer error=\"invalid_token\""
        );

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_key_unavailable_response_hides_detail() {
        let response = ValidationError::KeyUnavailable(KeyResolutionError::RemoteFetchFailed(
            "connection refused to 10.0.0.7".to_string(),
        ))
        .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
        assert_eq!(body["error"]["message"], "Service temporarily unavailable");
    }

    #[test]
    fn test_resolver_init_error_wraps_client_error() {
        let client_error = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();

        let err = ResolverInitError::from(client_error);
        assert!(err
            .to_string()
            .starts_with("failed to build JWKS HTTP client"));
    }
}
