//! Attribute checks for handlers that need more than "some caller".
//!
//! Authentication only attaches an identity; these helpers let a handler
//! require one, and require boolean attributes on it.

use crate::identity::Identity;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The request carried no identity.
    #[error("Authorization token required")]
    TokenRequired,

    /// The identity lacks a required attribute.
    #[error("You have no permissions to perform this operation")]
    InsufficientPermissions { attribute: String },
}

impl AuthorizationError {
    pub fn status_code(&self) -> u16 {
        match self {
            AuthorizationError::TokenRequired => 400,
            AuthorizationError::InsufficientPermissions { .. } => 401,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthorizationError {
    fn into_response(self) -> Response {
        let code = match &self {
            AuthorizationError::TokenRequired => "TOKEN_REQUIRED",
            AuthorizationError::InsufficientPermissions { attribute } => {
                tracing::debug!(target: "identity.authorization", attribute = %attribute, "Missing required attribute");
                "INSUFFICIENT_PERMISSIONS"
            }
        };

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::UNAUTHORIZED);
        let body = ErrorResponse {
            error: ErrorDetail {
                code,
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Require an identity carrying every attribute in `required` set to `true`.
///
/// # Errors
///
/// - `TokenRequired` - no identity (anonymous request)
/// - `InsufficientPermissions` - first required attribute that is absent,
///   `false`, or not a boolean
pub fn require_attributes<'a>(
    identity: Option<&'a Identity>,
    required: &[&str],
) -> Result<&'a Identity, AuthorizationError> {
    let identity = identity.ok_or(AuthorizationError::TokenRequired)?;

    if let Some(missing) = required.iter().find(|name| !identity.flag(name)) {
        return Err(AuthorizationError::InsufficientPermissions {
            attribute: (*missing).to_string(),
        });
    }

    Ok(identity)
}
