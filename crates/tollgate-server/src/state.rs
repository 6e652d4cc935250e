//! Application state shared across handlers.

use std::sync::Arc;

use tollgate_auth::TokenStore;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
///
/// Handlers only read the token store; the refresh scheduler owns writes.
#[derive(Clone)]
pub struct AppState {
    /// Current access token, written by the refresh scheduler.
    pub tokens: TokenStore,

    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Reused HTTP client for upstream forwarding.
    pub client: reqwest::Client,
}

impl AppState {
    /// Create a new application state.
    pub fn new(tokens: TokenStore, config: ServerConfig) -> Self {
        Self {
            tokens,
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }
}
