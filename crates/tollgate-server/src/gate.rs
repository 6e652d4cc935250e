//! Access-gate middleware.
//!
//! Optionally enforces a static bearer token before requests reach the proxy
//! handler. With no token configured the gate is a no-op and the proxy is
//! open to anyone who can reach the listener.
//!
//! Token comparison is constant-time to avoid timing leaks.

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::error::ServerError;
use crate::state::AppState;

/// Compare two strings in constant time.
///
/// When lengths differ a dummy comparison runs anyway to keep timing
/// consistent, and the result is false.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    if a_bytes.len() == b_bytes.len() {
        a_bytes.ct_eq(b_bytes).into()
    } else {
        let _ = a_bytes.ct_eq(a_bytes);
        false
    }
}

/// Bearer-token check in front of the proxy handler.
///
/// Runs after prefix stripping and before the readiness check.
pub async fn gate_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(ref expected) = state.config.protect_token else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ServerError::AccessDenied)?;

    let expected_header = format!("Bearer {expected}");
    if !constant_time_eq(presented, &expected_header) {
        return Err(ServerError::AccessDenied);
    }

    Ok(next.run(request).await)
}
