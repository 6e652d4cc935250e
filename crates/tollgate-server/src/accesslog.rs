//! Access logging with a write-once status record.
//!
//! Each request gets a [`StatusLatch`] that captures the first status code
//! written for its response; later writes with a different code are ignored.
//! The middleware emits exactly one structured record per request, after the
//! response body has fully streamed (or the client went away).

use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};
use std::time::Instant;

use axum::{
    body::{Body, BodyDataStream, Bytes},
    extract::Request,
    http::{Method, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use futures::Stream;

/// Write-once holder for the response status of a single request.
///
/// Clones share the same slot; the first recorded status wins.
#[derive(Debug, Clone, Default)]
pub struct StatusLatch {
    code: Arc<OnceLock<StatusCode>>,
}

impl StatusLatch {
    /// Create an empty latch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status code. A no-op if one was already recorded.
    pub fn record(&self, status: StatusCode) {
        let _ = self.code.set(status);
    }

    /// The recorded status, if any.
    pub fn get(&self) -> Option<StatusCode> {
        self.code.get().copied()
    }
}

/// Emit one structured access-log record per request.
///
/// The latch is placed in request extensions so the proxy handler can record
/// the status it commits before streaming; the final response status is only
/// used when nothing recorded earlier. The record itself rides the response
/// body: for streamed upstream responses it fires only once the stream ends,
/// so `duration_ms` covers the whole transfer, not just time to first byte.
pub async fn access_log_middleware(mut request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let latch = StatusLatch::new();
    request.extensions_mut().insert(latch.clone());

    let start = Instant::now();
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let record = LogRecord {
        method,
        uri,
        head_status: parts.status,
        latch,
        start,
    };
    let body = Body::from_stream(LogOnFinish {
        inner: body.into_data_stream(),
        record: Some(record),
    });
    Response::from_parts(parts, body)
}

/// Pending access-log record. Emission happens in `Drop`, so the record also
/// fires when the client disconnects and the body is dropped mid-stream.
struct LogRecord {
    method: Method,
    uri: Uri,
    head_status: StatusCode,
    latch: StatusLatch,
    start: Instant,
}

impl Drop for LogRecord {
    fn drop(&mut self) {
        let status = self.latch.get().unwrap_or(self.head_status);
        let duration_ms = self.start.elapsed().as_millis() as u64;

        if status.is_server_error() {
            tracing::error!(
                target: "accesslog",
                method = %self.method,
                url = %self.uri,
                status = status.as_u16(),
                duration_ms,
                "proxied request"
            );
        } else if status.is_client_error() {
            tracing::warn!(
                target: "accesslog",
                method = %self.method,
                url = %self.uri,
                status = status.as_u16(),
                duration_ms,
                "proxied request"
            );
        } else {
            tracing::info!(
                target: "accesslog",
                method = %self.method,
                url = %self.uri,
                status = status.as_u16(),
                duration_ms,
                "proxied request"
            );
        }
    }
}

/// Body stream that releases its pending record when the inner stream
/// terminates, either cleanly or with an error.
struct LogOnFinish {
    inner: BodyDataStream,
    record: Option<LogRecord>,
}

impl Stream for LogOnFinish {
    type Item = std::result::Result<Bytes, axum::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(None) => {
                this.record.take();
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.record.take();
                Poll::Ready(Some(Err(e)))
            }
            other => other,
        }
    }
}
