//! HTTP surface for the tollgate proxy.
//!
//! Mounts the authenticated proxy under a configurable base path, exposes a
//! readiness probe, and serves connections with a bounded client header-read
//! timeout.
//!
//! # Components
//!
//! - [`gate`] — optional static bearer check in front of the proxy
//! - [`proxy`] — readiness gating, header injection, streamed forwarding
//! - [`accesslog`] — write-once status capture and per-request log record
//! - [`routes`] — router assembly and the `/ready` endpoint
//!
//! # Example
//!
//! ```ignore
//! use tollgate_auth::TokenStore;
//! use tollgate_server::{Server, ServerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let store = TokenStore::new();
//! let config = ServerConfig::new(Some("secret".to_string()));
//! let server = Server::new(store, config);
//! server.run(CancellationToken::new()).await?;
//! ```

pub mod accesslog;
pub mod config;
pub mod error;
pub mod gate;
pub mod proxy;
pub mod routes;
pub mod state;

pub use accesslog::StatusLatch;
pub use config::{ServerConfig, UpstreamHeaders};
pub use error::{Result, ServerError};
pub use state::AppState;

use std::net::SocketAddr;

use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tollgate_auth::TokenStore;
use tracing::{debug, info, warn};

/// The tollgate HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a server reading tokens from `store`.
    pub fn new(store: TokenStore, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(store, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }

    /// Bind the configured address and serve until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.state.config.bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already-bound listener until `shutdown`
    /// fires. In-flight requests drain on their own tasks.
    ///
    /// Connections are served through hyper-util's connection builder rather
    /// than `axum::serve` so the client header-read timeout can be enforced.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Failed to read local addr: {}", e)))?;
        info!(
            addr = %local_addr,
            base_path = %self.state.config.base_path,
            upstream = %self.state.config.upstream,
            "starting tollgate server"
        );
        if self.state.config.protect_token.is_none() {
            warn!("no protect token configured; the proxy accepts unauthenticated requests");
        }

        let service = TowerToHyperService::new(self.router());
        let header_read_timeout = self.state.config.header_read_timeout;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown signal received, stopping accept loop");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);
                    let service = service.clone();
                    tokio::spawn(async move {
                        let mut builder = ConnectionBuilder::new(TokioExecutor::new());
                        builder
                            .http1()
                            .timer(TokioTimer::new())
                            .header_read_timeout(header_read_timeout);
                        if let Err(e) = builder.serve_connection_with_upgrades(io, service).await {
                            debug!(peer = %peer, error = %e, "connection closed with error");
                        }
                    });
                }
            }
        }
    }
}
