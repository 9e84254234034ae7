//! Backend service calls.
//!
//! A [`BackendService`] sends one forwarded request to one backend on behalf
//! of a client request. The HTTP implementation applies credential
//! propagation to every outgoing request before it is sent.
//!
//! # Security
//!
//! - The client's token is forwarded verbatim as `jwt`, never validated here
//! - Timeouts prevent hanging connections
//! - Transport errors are logged server-side with generic messages returned

use crate::config::Config;
use crate::context::RequestContext;
use crate::errors::GatewayError;
use crate::observability::metrics;
use crate::propagation::apply_credential;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Connect timeout for backend calls in seconds.
const BACKEND_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Request forwarded to a backend service.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    /// Body forwarded verbatim.
    pub body: Bytes,

    /// Content type of the body (default: application/json).
    pub content_type: HeaderValue,
}

impl BackendRequest {
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            content_type: HeaderValue::from_static("application/json"),
        }
    }
}

/// Response returned by a backend service.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for BackendResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        match self.content_type {
            Some(content_type) => {
                response
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, content_type);
            }
            None => {
                response.headers_mut().remove(header::CONTENT_TYPE);
            }
        }
        response
    }
}

/// One backend service reachable from the gateway.
#[async_trait]
pub trait BackendService: Send + Sync {
    /// Service name, as used in the gateway's routes.
    fn name(&self) -> &str;

    /// Send `request` on behalf of the client described by `context`.
    ///
    /// # Errors
    ///
    /// `GatewayError::Upstream` if the backend cannot be reached or its
    /// response cannot be read. Non-2xx backend responses are returned, not
    /// treated as errors.
    async fn send(
        &self,
        request: BackendRequest,
        context: &RequestContext,
    ) -> Result<BackendResponse, GatewayError>;
}

/// [`BackendService`] that POSTs to a backend over HTTP(S).
#[derive(Clone)]
pub struct HttpBackendService {
    /// Service name.
    name: String,

    /// Endpoint receiving forwarded requests.
    url: String,

    /// HTTP client with configured timeouts.
    client: reqwest::Client,
}

impl HttpBackendService {
    /// Create a client for the backend `name` at `url`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the HTTP client cannot be built.
    pub fn new(name: String, url: String, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(BACKEND_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                tracing::error!(target: "gateway.backend", error = %e, "Failed to build HTTP client");
                GatewayError::Internal
            })?;

        Ok(Self { name, url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn upstream_error(&self, reason: String) -> GatewayError {
        GatewayError::Upstream {
            service: self.name.clone(),
            reason,
        }
    }
}

#[async_trait]
impl BackendService for HttpBackendService {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, name = "gateway.backend.send", fields(service = %self.name))]
    async fn send(
        &self,
        request: BackendRequest,
        context: &RequestContext,
    ) -> Result<BackendResponse, GatewayError> {
        let started = Instant::now();

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, request.content_type);
        apply_credential(context, &mut headers);

        let result = self
            .client
            .post(&self.url)
            .headers(headers)
            .body(request.body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                metrics::record_backend_call(&self.name, "error", started.elapsed());
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("request failed: {e}")
                };
                return Err(self.upstream_error(reason));
            }
        };

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes().await.map_err(|e| {
            metrics::record_backend_call(&self.name, "error", started.elapsed());
            self.upstream_error(format!("failed to read response body: {e}"))
        })?;

        metrics::record_backend_call(&self.name, status_category(status), started.elapsed());
        tracing::debug!(
            target: "gateway.backend",
            status = status.as_u16(),
            credential = context.has_credential(),
            "Backend call completed"
        );

        Ok(BackendResponse {
            status,
            content_type,
            body,
        })
    }
}

fn status_category(status: StatusCode) -> &'static str {
    if status.is_success() {
        "success"
    } else if status.is_client_error() {
        "client_error"
    } else {
        "server_error"
    }
}

/// Backend services by name.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    services: HashMap<String, Arc<dyn BackendService>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One [`HttpBackendService`] per configured service.
    ///
    /// # Errors
    ///
    /// `GatewayError::Internal` if an HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let mut registry = Self::new();
        for (name, url) in &config.services {
            let service =
                HttpBackendService::new(name.clone(), url.clone(), config.request_timeout)?;
            registry.register(Arc::new(service));
        }
        Ok(registry)
    }

    /// Add or replace a service under its own name.
    pub fn register(&mut self, service: Arc<dyn BackendService>) {
        self.services.insert(service.name().to_string(), service);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BackendService>> {
        self.services.get(name).cloned()
    }

    /// Registered service names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend_at(mock_server: &MockServer) -> HttpBackendService {
        HttpBackendService::new(
            "users".to_string(),
            format!("{}/graphql", mock_server.uri()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_forwards_body_and_credential() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header_eq("jwt", "abc.def.ghi"))
            .and(header_eq("content-type", "application/json"))
            .and(body_string(r#"{"query":"{ me { id } }"}"#))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {"me": null}})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = backend_at(&mock_server).await;
        let response = backend
            .send(
                BackendRequest::json(r#"{"query":"{ me { id } }"}"#),
                &RequestContext::with_credential("abc.def.ghi"),
            )
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.content_type.unwrap().to_str().unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_send_without_credential_omits_header() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let backend = backend_at(&mock_server).await;
        backend
            .send(BackendRequest::json("{}"), &RequestContext::anonymous())
            .await
            .unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests.first().unwrap().headers.contains_key("jwt"));
    }

    #[tokio::test]
    async fn test_backend_error_status_is_returned() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&mock_server)
            .await;

        let backend = backend_at(&mock_server).await;
        let response = backend
            .send(BackendRequest::json("{}"), &RequestContext::anonymous())
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body, Bytes::from_static(b"nope"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_upstream_error() {
        let backend = HttpBackendService::new(
            "users".to_string(),
            "http://127.0.0.1:1/graphql".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = backend
            .send(BackendRequest::json("{}"), &RequestContext::anonymous())
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Upstream { ref service, .. } if service == "users"));
    }

    #[test]
    fn test_registry_from_config() {
        let config = Config::from_vars(&HashMap::new()).unwrap();
        let registry = BackendRegistry::from_config(&config).unwrap();

        assert_eq!(registry.names(), vec!["comments", "posts", "users"]);
        assert!(registry.get("users").is_some());
        assert!(registry.get("billing").is_none());
    }

    #[test]
    fn test_status_category() {
        assert_eq!(status_category(StatusCode::OK), "success");
        assert_eq!(status_category(StatusCode::UNAUTHORIZED), "client_error");
        assert_eq!(status_category(StatusCode::BAD_GATEWAY), "server_error");
    }
}
