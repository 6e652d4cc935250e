//! tollgate - authenticating reverse proxy with automatic token rotation.
//!
//! Main entry point: flag parsing, logging setup, credential resolution and
//! wiring of the refresh scheduler and HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tollgate_auth::{HttpExchanger, RefreshScheduler, TokenStore, credentials};
use tollgate_server::{Server, ServerConfig};

/// Authenticating reverse proxy with automatic upstream token rotation.
#[derive(Parser)]
#[command(name = "tollgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Long-lived OAuth credential. Read from the editor's apps.json when omitted.
    #[arg(long, env = "TOLLGATE_OAUTH_TOKEN", hide_env_values = true)]
    oauth_token: Option<String>,

    /// Static token clients must present. Omitting it leaves the proxy open.
    #[arg(long, env = "TOLLGATE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Base path under which the proxy is mounted.
    #[arg(long, default_value = "/api/v1")]
    base_path: String,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "tollgate=debug,tollgate_auth=debug,tollgate_server=debug,info"
    } else {
        "tollgate=info,tollgate_auth=info,tollgate_server=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    if cli.access_token.as_deref().map_or(true, str::is_empty) {
        warn!("no access token configured; anyone who can reach the listener can use the proxy");
    }

    // Startup is the only place a credential failure is fatal.
    let credential = match cli.oauth_token {
        Some(token) => token,
        None => {
            info!("no OAuth token provided, reading credential from apps.json");
            credentials::load_default_credential()
                .context("no usable long-lived credential (flag, env or apps.json)")?
        }
    };

    let store = TokenStore::new();
    let exchanger = Arc::new(HttpExchanger::new(credential));
    let scheduler = RefreshScheduler::new(store.clone(), exchanger);

    let shutdown = CancellationToken::new();
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal_shutdown.cancel();
        }
    });

    let config = ServerConfig::new(cli.access_token)
        .with_bind_address(cli.addr)
        .with_base_path(cli.base_path);
    let server = Server::new(store, config);

    let result = server.run(shutdown.clone()).await;
    shutdown.cancel();
    let _ = scheduler_handle.await;

    result.context("server error")
}
