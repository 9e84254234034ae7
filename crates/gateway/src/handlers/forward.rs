//! Forwarding handler.
//!
//! Sends the client's body to the named backend service and relays the
//! backend's response. The client's credential travels with the call via
//! the request context; nothing here inspects it.

use crate::backend::BackendRequest;
use crate::context::RequestContext;
use crate::errors::GatewayError;
use crate::observability::metrics;
use crate::routes::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /:service/graphql
///
/// # Errors
///
/// - `UnknownService` (404) - no backend with that name
/// - `Upstream` (502) - the backend could not be reached
#[instrument(skip_all, name = "gateway.forward", fields(service = %service))]
pub async fn forward_graphql(
    State(state): State<Arc<AppState>>,
    Path(service): Path<String>,
    Extension(context): Extension<RequestContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let backend = state.backends.get(&service).ok_or_else(|| {
        tracing::debug!(target: "gateway.forward", service = %service, "Unknown service");
        GatewayError::UnknownService(service.clone())
    })?;

    metrics::record_forwarded_request(context.has_credential());

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    let request = BackendRequest {
        body,
        content_type,
    };

    let response = backend.send(request, &context).await?;
    Ok(response.into_response())
}
