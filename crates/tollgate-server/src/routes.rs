//! Router assembly and the readiness endpoint.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::accesslog;
use crate::error::ServerError;
use crate::gate;
use crate::proxy;
use crate::state::AppState;

/// Readiness probe: `200 OK` while a valid access token is held.
///
/// Lives outside the base path and the access gate so orchestration can poll
/// it without credentials.
pub async fn ready(State(state): State<AppState>) -> Response {
    if state.tokens.ready() {
        (StatusCode::OK, "OK").into_response()
    } else {
        ServerError::NotReady.into_response()
    }
}

/// Build the full router: readiness endpoint plus the proxy nested under the
/// configured base path.
///
/// Ordering within the base path: prefix stripping (via nesting), then the
/// access gate, then the proxy handler's readiness check and forward.
pub fn router(state: AppState) -> Router {
    let proxied = Router::new()
        .fallback(proxy::proxy_handler)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::gate_middleware,
        ));

    let app = Router::new().route("/ready", get(ready));

    // axum rejects nesting at the root. A root base path means the proxy
    // answers everything that is not the readiness probe, with no prefix to
    // strip.
    let app = if state.config.base_path == "/" {
        app.fallback_service(proxied.with_state(state.clone()))
    } else {
        app.nest(&state.config.base_path, proxied)
    };

    app.layer(middleware::from_fn(accesslog::access_log_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
