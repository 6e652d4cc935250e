//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Default upstream API base URL.
pub const DEFAULT_UPSTREAM: &str = "https://api.githubcopilot.com";

/// Default base path under which the proxy is mounted.
pub const DEFAULT_BASE_PATH: &str = "/api/v1";

/// Timeout for reading request headers from a client connection. Bounds the
/// resource usage of slow clients; everything else keeps transport defaults.
pub const DEFAULT_HEADER_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Identification headers stamped on every upstream request.
///
/// The upstream enforces an undocumented client allowlist; these values are
/// plain configuration, not semantics tollgate relies on.
#[derive(Debug, Clone)]
pub struct UpstreamHeaders {
    /// `User-Agent` value.
    pub user_agent: String,
    /// `Copilot-Integration-Id` value.
    pub integration_id: String,
    /// `Editor-Version` value.
    pub editor_version: String,
    /// `Editor-Plugin-Version` value.
    pub editor_plugin_version: String,
}

impl Default for UpstreamHeaders {
    fn default() -> Self {
        Self {
            user_agent: "vscode-chat/dev".to_string(),
            integration_id: "vscode-chat".to_string(),
            editor_version: "Neovim/0.11.0".to_string(),
            editor_plugin_version: "copilot-chat/0.1.0".to_string(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Static token protecting the proxy. `None` disables the access gate,
    /// leaving the proxy open to anyone who can reach it.
    pub protect_token: Option<String>,

    /// URL prefix under which the proxy is mounted; stripped before forwarding.
    pub base_path: String,

    /// Upstream API base URL.
    pub upstream: String,

    /// Identification headers injected on upstream requests.
    pub upstream_headers: UpstreamHeaders,

    /// Client header read timeout.
    pub header_read_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".parse().expect("valid default address"),
            protect_token: None,
            base_path: DEFAULT_BASE_PATH.to_string(),
            upstream: DEFAULT_UPSTREAM.to_string(),
            upstream_headers: UpstreamHeaders::default(),
            header_read_timeout: DEFAULT_HEADER_READ_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Create a config with an optional protect token. `None` or an empty
    /// string leaves the proxy unauthenticated.
    pub fn new(protect_token: Option<String>) -> Self {
        Self {
            protect_token: protect_token.filter(|t| !t.is_empty()),
            ..Default::default()
        }
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the base path prefix. A leading slash is ensured, a trailing one
    /// removed.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        let raw = base_path.into();
        let trimmed = raw.trim_end_matches('/');
        self.base_path = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        self
    }

    /// Set the upstream base URL.
    pub fn with_upstream(mut self, upstream: impl Into<String>) -> Self {
        let raw = upstream.into();
        self.upstream = raw.trim_end_matches('/').to_string();
        self
    }

    /// Set the upstream identification headers.
    pub fn with_upstream_headers(mut self, headers: UpstreamHeaders) -> Self {
        self.upstream_headers = headers;
        self
    }

    /// Set the client header read timeout.
    pub fn with_header_read_timeout(mut self, timeout: Duration) -> Self {
        self.header_read_timeout = timeout;
        self
    }
}
