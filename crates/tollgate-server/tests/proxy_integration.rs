//! Integration tests for the proxy path: gate, readiness, header injection,
//! forwarding, and the full token-lifecycle round trip.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tollgate_auth::{AccessToken, HttpExchanger, RefreshScheduler, TokenStore};
use tollgate_server::{AppState, ServerConfig, UpstreamHeaders, routes};

fn valid_token(value: &str) -> AccessToken {
    AccessToken {
        token: value.to_string(),
        expires_at: chrono::Utc::now().timestamp() + 600,
        refresh_in: 600,
    }
}

fn test_headers() -> UpstreamHeaders {
    UpstreamHeaders {
        user_agent: "test-agent/1.0".to_string(),
        integration_id: "test-integration".to_string(),
        editor_version: "TestEditor/1.0".to_string(),
        editor_plugin_version: "test-plugin/1.0".to_string(),
    }
}

fn app_for(upstream: &MockServer, store: TokenStore, protect_token: Option<&str>) -> axum::Router {
    let config = ServerConfig::new(protect_token.map(String::from))
        .with_upstream(upstream.uri())
        .with_upstream_headers(test_headers());
    routes::router(AppState::new(store, config))
}

#[tokio::test]
async fn test_forward_injects_headers_and_preserves_path_query() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(query_param("page", "2"))
        .and(header("authorization", "Bearer t1"))
        .and(header("user-agent", "test-agent/1.0"))
        .and(header("copilot-integration-id", "test-integration"))
        .and(header("editor-version", "TestEditor/1.0"))
        .and(header("editor-plugin-version", "test-plugin/1.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-upstream", "yes")
                .set_body_string("model list"),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let store = TokenStore::new();
    store.install(valid_token("t1"));
    let app = app_for(&upstream, store, None);

    // Client-supplied Authorization must be overwritten, not forwarded.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/models?page=2")
                .header("Authorization", "Bearer client-junk")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-upstream").unwrap(),
        "yes"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"model list");
}

#[tokio::test]
async fn test_forward_streams_request_body() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string("{\"prompt\":\"hi\"}"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .expect(1)
        .mount(&upstream)
        .await;

    let store = TokenStore::new();
    store.install(valid_token("t1"));
    let app = app_for(&upstream, store, None);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/chat/completions")
                .body(Body::from("{\"prompt\":\"hi\"}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_error_status_passes_through() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fail"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
        .mount(&upstream)
        .await;

    let store = TokenStore::new();
    store.install(valid_token("t1"));
    let app = app_for(&upstream, store, None);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/fail")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"upstream broke");
}

#[tokio::test]
async fn test_unreachable_upstream_yields_502() {
    let store = TokenStore::new();
    store.install(valid_token("t1"));
    let config = ServerConfig::new(None).with_upstream("http://127.0.0.1:1");
    let app = routes::router(AppState::new(store, config));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/anything")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_gate_token_differs_from_upstream_bearer() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/foo"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&upstream)
        .await;

    let store = TokenStore::new();
    store.install(valid_token("t1"));
    let app = app_for(&upstream, store, Some("gate-secret"));

    // The gate validates its own token; the upstream sees the access token.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/foo")
                .header("Authorization", "Bearer gate-secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/foo")
                .header("Authorization", "Bearer t1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

async fn wait_until_ready(store: &TokenStore) -> bool {
    for _ in 0..200 {
        if store.ready() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_end_to_end_refresh_then_proxy() {
    let issuance = MockServer::start().await;
    let now = chrono::Utc::now().timestamp();
    Mock::given(method("GET"))
        .and(path("/token"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "t1",
            "expires_at": now + 600,
            "refresh_in": 600
        })))
        .mount(&issuance)
        .await;

    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/foo"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&upstream)
        .await;

    let store = TokenStore::new();
    let exchanger =
        Arc::new(HttpExchanger::new("abc").with_endpoint(format!("{}/token", issuance.uri())));
    let cancel = CancellationToken::new();
    let scheduler = RefreshScheduler::new(store.clone(), exchanger);
    let handle = tokio::spawn(scheduler.run(cancel.clone()));

    assert!(wait_until_ready(&store).await, "token never became ready");

    let app = app_for(&upstream, store, None);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/foo")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_end_to_end_failed_issuance_stays_unready() {
    let issuance = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("issuance down"))
        .mount(&issuance)
        .await;

    // Upstream must never be contacted.
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let store = TokenStore::new();
    let exchanger =
        Arc::new(HttpExchanger::new("abc").with_endpoint(format!("{}/token", issuance.uri())));
    let cancel = CancellationToken::new();
    let scheduler = RefreshScheduler::new(store.clone(), exchanger);
    let handle = tokio::spawn(scheduler.run(cancel.clone()));

    // Give the first (failing) exchange time to complete.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!store.ready());

    let app = app_for(&upstream, store, None);
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/foo")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    cancel.cancel();
    handle.await.unwrap();
}
