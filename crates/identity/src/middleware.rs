//! Inbound authentication middleware for backend services.
//!
//! Reads the token the gateway forwarded in the `jwt` header, validates it,
//! and stores the resulting [`Identity`] in request extensions.
//!
//! # Behavior
//!
//! - No header (or an empty one): the request proceeds anonymously. Whether
//!   an anonymous caller may do something is the business logic's decision.
//! - Valid token: the identity is attached and the request proceeds.
//! - Invalid token: the request is answered immediately, 401 for malformed
//!   tokens and bad signatures, 503 when no key could be resolved.
//!
//! Exactly one validation attempt is made per request.

use crate::errors::ValidationError;
use crate::identity::Identity;
use crate::validator::TokenValidator;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::{self, Next},
    response::Response,
    Router,
};
use common::headers::PROPAGATED_TOKEN_HEADER;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token validator bound to the process-wide key resolver.
    pub validator: TokenValidator,
}

impl AuthState {
    pub fn new(validator: TokenValidator) -> Arc<Self> {
        Arc::new(Self { validator })
    }
}

/// Authentication middleware.
///
/// # Header Format
///
/// ```text
/// jwt: <token>
/// ```
#[instrument(skip(state, req, next), name = "identity.middleware.auth")]
pub async fn authenticate(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ValidationError> {
    let Some(header_value) = req.headers().get(PROPAGATED_TOKEN_HEADER) else {
        tracing::debug!(target: "identity.middleware", "No token header, proceeding anonymously");
        return Ok(next.run(req).await);
    };

    let token = header_value
        .to_str()
        .map_err(|_| {
            tracing::debug!(target: "identity.middleware", "Token header is not visible ASCII");
            ValidationError::Malformed
        })?
        .trim()
        .to_string();

    if token.is_empty() {
        tracing::debug!(target: "identity.middleware", "Empty token header, proceeding anonymously");
        return Ok(next.run(req).await);
    }

    let identity = state.validator.validate(&token).await.map_err(|e| {
        tracing::info!(
            target: "identity.middleware",
            outcome = e.kind(),
            status = e.status_code(),
            "Rejecting request with invalid token"
        );
        e
    })?;

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Wrap every route of `router` with [`authenticate`].
pub fn with_authentication<S>(router: Router<S>, state: Arc<AuthState>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(state, authenticate))
}

/// Extension trait for reading the identity from a request.
pub trait IdentityExt {
    /// The validated identity, or `None` for anonymous requests.
    fn identity(&self) -> Option<&Identity>;
}

impl<B> IdentityExt for axum::http::Request<B> {
    fn identity(&self) -> Option<&Identity> {
        self.extensions().get::<Identity>()
    }
}

/// Extractor yielding the caller's identity, if any.
///
/// Never rejects: anonymous requests extract as `CallerIdentity(None)`.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Option<Identity>);

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Identity>().cloned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::keys::StaticKeyResolver;
    use axum::{body::Body, http::StatusCode, routing::get};
    use tower::ServiceExt;

    async fn whoami(CallerIdentity(identity): CallerIdentity) -> String {
        match identity {
            Some(identity) => identity.subject,
            None => "anonymous".to_string(),
        }
    }

    fn app() -> Router {
        let state = AuthState::new(TokenValidator::new(Arc::new(StaticKeyResolver::unloaded())));
        with_authentication(Router::new().route("/whoami", get(whoami)), state)
    }

    #[test]
    fn test_auth_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AuthState>();
    }

    #[tokio::test]
    async fn test_missing_header_proceeds_anonymously() {
        let response = app()
            .oneshot(Request::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_header_proceeds_anonymously() {
        let response = app()
            .oneshot(
                Request::get("/whoami")
                    .header(PROPAGATED_TOKEN_HEADER, "")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_token_is_unauthorized() {
        let response = app()
            .oneshot(
                Request::get("/whoami")
                    .header(PROPAGATED_TOKEN_HEADER, "not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unavailable_key_is_service_unavailable() {
        let response = app()
            .oneshot(
                Request::get("/whoami")
                    .header(PROPAGATED_TOKEN_HEADER, "eyJhbGciOiJFZERTQSJ9.e30.c2ln")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_identity_ext_reads_extensions() {
        let mut req = axum::http::Request::new(());
        assert!(req.identity().is_none());

        req.extensions_mut().insert(Identity::new("user-1"));
        assert_eq!(req.identity().map(|i| i.subject.as_str()), Some("user-1"));
    }
}
