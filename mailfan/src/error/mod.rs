//! Error types and HTTP error responses
//!
//! Every handler failure maps to an HTTP status plus a JSON envelope of
//! the form `{"success": false, "error": "..."}`, so browser-side code can
//! treat all error responses uniformly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::dispatch::DispatchRejection;
use crate::identity::AuthError;

/// Service error type
#[derive(Debug, Error)]
pub enum MailfanError {
    /// No valid session accompanies the request (401)
    #[error("User not authenticated")]
    AbsentSession,

    /// The identity provider rejected a credential operation (401)
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The dispatch request failed validation (400)
    #[error(transparent)]
    Validation(#[from] DispatchRejection),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MailfanError {
    /// HTTP status this error maps to
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::AbsentSession | Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Configuration error from any message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Internal error from any message
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl IntoResponse for MailfanError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
