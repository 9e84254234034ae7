//! Liveness handler.

use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub services: Vec<String>,
}

/// Liveness probe. Does not contact backends.
#[tracing::instrument(skip_all, name = "gateway.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        services: state
            .backends
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}
