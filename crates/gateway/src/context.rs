//! Per-request context carrying the client's credential.
//!
//! The credential is captured once from the inbound `Authorization` header
//! and lives only as long as the client request. It is never validated here.

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use common::headers::AUTHORIZATION_HEADER;
use common::secret::{ExposeSecret, SecretString};
use std::fmt;
use tracing::instrument;

/// Per-request bag for the raw client credential.
#[derive(Clone, Default)]
pub struct RequestContext {
    credential: Option<SecretString>,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field(
                "credential",
                &self.credential.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl RequestContext {
    /// Context for a client that sent no usable credential.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_credential(token: impl Into<String>) -> Self {
        Self {
            credential: Some(SecretString::from(token.into())),
        }
    }

    /// Build the context from inbound client headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let credential = headers
            .get(AUTHORIZATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_credential);

        Self { credential }
    }

    pub fn credential(&self) -> Option<&SecretString> {
        self.credential.as_ref()
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }
}

/// Extract the token from an `Authorization` value of the form
/// `<scheme> <token>`.
///
/// The scheme is not checked. Anything other than exactly two
/// whitespace-separated parts yields no credential.
pub fn extract_credential(value: &str) -> Option<SecretString> {
    let mut parts = value.split_whitespace();
    let (Some(_scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    Some(SecretString::from(token.to_string()))
}

/// Middleware storing a [`RequestContext`] in request extensions.
///
/// Never rejects: a missing or malformed header only means the request
/// carries no credential downstream.
#[instrument(skip_all, name = "gateway.context.capture")]
pub async fn capture_credential(mut req: Request, next: Next) -> Response {
    let context = RequestContext::from_headers(req.headers());

    if context.has_credential() {
        tracing::debug!(target: "gateway.propagation", "Client credential captured");
    } else if req.headers().contains_key(AUTHORIZATION_HEADER) {
        tracing::debug!(target: "gateway.propagation", "Malformed authorization header, proceeding without credential");
    }

    req.extensions_mut().insert(context);
    next.run(req).await
}

/// Expose the token text for writing onto an outbound request.
pub(crate) fn credential_text(context: &RequestContext) -> Option<&str> {
    context.credential().map(ExposeSecret::expose_secret)
}
