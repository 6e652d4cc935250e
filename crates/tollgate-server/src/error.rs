//! Error types for the proxy's HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors surfaced on the HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No valid access token is currently held.
    #[error("Service not ready")]
    NotReady,

    /// Access-gate bearer token mismatch.
    #[error("Invalid access token")]
    AccessDenied,

    /// Failure while forwarding to or streaming from the upstream.
    #[error("Upstream error: {0}")]
    UpstreamForward(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::AccessDenied => StatusCode::UNAUTHORIZED,
            ServerError::UpstreamForward(_) => StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}
