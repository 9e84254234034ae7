//! Test server harness for E2E testing
//!
//! Provides TestBackendServer: a minimal backend service guarded by the
//! identity middleware, for driving the gateway end to end.

use axum::{
    routing::{get, post},
    Json, Router,
};
use identity::middleware::{with_authentication, AuthState, CallerIdentity};
use identity::{require_attributes, AuthorizationError, SigningKeyResolver, TokenValidator};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Backend service spawned on a random local port.
///
/// Routes:
/// - `GET /whoami` - the caller's identity, or `{"subject": null}`
/// - `POST /graphql` - echoes the query with the caller's subject
/// - `GET`/`POST /admin` - requires the `isAdmin` attribute
///
/// # Example
/// ```rust,ignore
/// let keypair = TestKeypair::new(1, "key-1");
/// let backend = TestBackendServer::spawn(keypair.static_resolver()).await?;
///
/// let response = reqwest::Client::new()
///     .get(format!("{}/whoami", backend.url()))
///     .header("jwt", keypair.sign_token(&claims))
///     .send()
///     .await?;
/// ```
pub struct TestBackendServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestBackendServer {
    /// Spawn a backend validating tokens with `resolver`.
    pub async fn spawn(resolver: Arc<dyn SigningKeyResolver>) -> Result<Self, anyhow::Error> {
        let state = AuthState::new(TokenValidator::new(resolver));
        let app = with_authentication(routes(), state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test backend: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test backend error: {}", e);
            }
        });

        Ok(Self {
            addr,
            handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for TestBackendServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn routes() -> Router {
    Router::new()
        .route("/whoami", get(whoami))
        .route("/graphql", post(graphql))
        .route("/admin", get(admin).post(admin))
}

async fn whoami(CallerIdentity(identity): CallerIdentity) -> Json<Value> {
    Json(match identity {
        Some(identity) => json!({
            "subject": identity.subject,
            "attributes": identity.attributes,
        }),
        None => json!({ "subject": null }),
    })
}

async fn graphql(CallerIdentity(identity): CallerIdentity, Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "data": {
            "viewer": identity.map(|identity| identity.subject),
            "query": body.get("query").cloned().unwrap_or(Value::Null),
        }
    }))
}

async fn admin(CallerIdentity(identity): CallerIdentity) -> Result<Json<Value>, AuthorizationError> {
    let identity = require_attributes(identity.as_ref(), &["isAdmin"])?;
    Ok(Json(json!({ "granted": identity.subject })))
}
