//! HTTP routes for the gateway.
//!
//! Defines the Axum router and application state.

use crate::backend::BackendRegistry;
use crate::config::Config;
use crate::context::capture_credential;
use crate::handlers;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Backend services by name.
    pub backends: BackendRegistry,

    /// Gateway configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe
/// - `/metrics` - Prometheus metrics endpoint
/// - `/:service/graphql` - Forward to a backend service, propagating the
///   client's credential
/// - TraceLayer for request logging
/// - Request timeout from configuration
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = state.config.request_timeout;

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Forwarded routes; each request captures its credential first
    let forward_routes = Router::new()
        .route("/:service/graphql", post(handlers::forward_graphql))
        .route_layer(middleware::from_fn(capture_credential))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    public_routes
        .merge(metrics_routes)
        .merge(forward_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backend::{BackendRequest, BackendResponse, BackendService};
    use crate::context::RequestContext;
    use crate::errors::GatewayError;
    use async_trait::async_trait;
    use axum::{
        body::{Body, Bytes},
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Backend that records the credential of each call.
    struct RecordingBackend {
        seen: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl BackendService for RecordingBackend {
        fn name(&self) -> &str {
            "users"
        }

        async fn send(
            &self,
            request: BackendRequest,
            context: &RequestContext,
        ) -> Result<BackendResponse, GatewayError> {
            let mut headers = axum::http::HeaderMap::new();
            crate::propagation::apply_credential(context, &mut headers);
            let jwt = headers
                .get("jwt")
                .map(|value| value.to_str().unwrap().to_string());
            self.seen.lock().unwrap().push(jwt);

            Ok(BackendResponse {
                status: StatusCode::OK,
                content_type: None,
                body: request.body,
            })
        }
    }

    fn app() -> (Router, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend {
            seen: Mutex::new(Vec::new()),
        });
        let mut backends = BackendRegistry::new();
        backends.register(backend.clone());

        let state = Arc::new(AppState {
            backends,
            config: Config::from_vars(&HashMap::new()).unwrap(),
        });
        let handle = PrometheusBuilder::new().build_recorder().handle();

        (build_routes(state, handle), backend)
    }

    fn graphql_request(uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri).header("content-type", "application/json");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::from(r#"{"query":"{ me }"}"#)).unwrap()
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_forward_propagates_credential() {
        let (app, backend) = app();

        let response = app
            .oneshot(graphql_request("/users/graphql", Some("Bearer tok-123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(br#"{"query":"{ me }"}"#));
        assert_eq!(*backend.seen.lock().unwrap(), vec![Some("tok-123".to_string())]);
    }

    #[tokio::test]
    async fn test_forward_without_authorization_sends_no_jwt() {
        let (app, backend) = app();

        let response = app.oneshot(graphql_request("/users/graphql", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*backend.seen.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_forward_with_malformed_authorization_sends_no_jwt() {
        let (app, backend) = app();

        let response = app
            .oneshot(graphql_request("/users/graphql", Some("Bearer")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*backend.seen.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_unknown_service_is_not_found() {
        let (app, backend) = app();

        let response = app
            .oneshot(graphql_request("/billing/graphql", Some("Bearer tok")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_lists_services() {
        let (app, _) = app();

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["services"], serde_json::json!(["users"]));
    }
}
