//! Authenticated proxy handler.
//!
//! Per-request path: readiness check, rewrite to the fixed upstream, header
//! injection, streamed forwarding. Bodies are streamed in both directions,
//! never buffered.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    response::Response,
};
use futures::StreamExt;

use crate::accesslog::StatusLatch;
use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Connection-scoped headers that must not be forwarded (RFC 7230 §6.1).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ServerError::Internal(format!("invalid header value: {}", e)))
}

/// Forward one request to the upstream with the current token injected.
///
/// Mounted as the fallback of the nested proxy router, so the base-path
/// prefix is already stripped from the request URI.
pub async fn proxy_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response> {
    // Hard precondition: never contact the upstream without a valid token.
    // bearer() checks validity and renders the header under one read lock,
    // so the token observed here was valid at the instant of observation.
    let bearer = state.tokens.bearer().ok_or(ServerError::NotReady)?;

    let path_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", state.config.upstream, path_query);

    let latch = request.extensions().get::<StatusLatch>().cloned();
    let (parts, body) = request.into_parts();

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);

    // Injected headers overwrite anything the client supplied.
    let idh = &state.config.upstream_headers;
    headers.insert(header::AUTHORIZATION, header_value(&bearer)?);
    headers.insert(header::USER_AGENT, header_value(&idh.user_agent)?);
    headers.insert("copilot-integration-id", header_value(&idh.integration_id)?);
    headers.insert("editor-version", header_value(&idh.editor_version)?);
    headers.insert("editor-plugin-version", header_value(&idh.editor_plugin_version)?);

    let upstream_response = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send()
        .await
        .map_err(|e| ServerError::UpstreamForward(format!("{}: {}", url, e)))?;

    let status = upstream_response.status();
    if let Some(latch) = latch {
        // Commit the upstream status before streaming; a mid-stream failure
        // cannot change what was already written to the client.
        latch.record(status);
    }

    let mut response_headers = upstream_response.headers().clone();
    strip_hop_by_hop(&mut response_headers);

    let stream = upstream_response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));

    let mut builder = Response::builder().status(status);
    if let Some(headers) = builder.headers_mut() {
        *headers = response_headers;
    }
    builder
        .body(Body::from_stream(stream))
        .map_err(|e| ServerError::Internal(format!("failed to build response: {}", e)))
}
