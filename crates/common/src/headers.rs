//! Header names shared between the gateway and backend services.
//!
//! The gateway reads the client's `Authorization: <scheme> <token>` header and
//! forwards only the token, under [`PROPAGATED_TOKEN_HEADER`], on every call it
//! makes to a backend service. Backend services read the same header name.

/// Header carrying the raw bearer token (no scheme prefix) from the gateway to
/// backend services.
pub const PROPAGATED_TOKEN_HEADER: &str = "jwt";

/// Standard client authorization header read by the gateway.
pub const AUTHORIZATION_HEADER: &str = "authorization";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_are_lowercase() {
        // http::HeaderName only accepts lowercase static names
        assert_eq!(
            PROPAGATED_TOKEN_HEADER,
            PROPAGATED_TOKEN_HEADER.to_ascii_lowercase()
        );
        assert_eq!(AUTHORIZATION_HEADER, AUTHORIZATION_HEADER.to_ascii_lowercase());
    }
}
