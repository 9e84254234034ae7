//! Outbound credential propagation.
//!
//! Every backend call made on behalf of a client request carries that
//! client's token in the `jwt` header, or no `jwt` header at all. Nothing is
//! validated here; backend services validate for themselves.

use crate::context::{credential_text, RequestContext};
use axum::http::{HeaderMap, HeaderValue};
use common::headers::PROPAGATED_TOKEN_HEADER;

/// Write the context's credential onto outbound `headers`.
///
/// Any `jwt` header already present is replaced, or removed when the client
/// sent no credential.
pub fn apply_credential(context: &RequestContext, headers: &mut HeaderMap) {
    let Some(token) = credential_text(context) else {
        headers.remove(PROPAGATED_TOKEN_HEADER);
        return;
    };

    match HeaderValue::from_str(token) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(PROPAGATED_TOKEN_HEADER, value);
        }
        Err(_) => {
            // Only reachable for tokens not taken from a header
            tracing::warn!(target: "gateway.propagation", "Credential is not a valid header value, omitting");
            headers.remove(PROPAGATED_TOKEN_HEADER);
        }
    }
}
