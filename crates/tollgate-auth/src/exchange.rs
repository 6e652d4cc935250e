//! Credential exchange: one round trip that trades the long-lived credential
//! for a short-lived access token.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{AuthError, Result};
use crate::token::AccessToken;

/// Default token issuance endpoint.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://api.github.com/copilot_internal/v2/token";

/// Default `User-Agent` presented to the issuance endpoint.
pub const DEFAULT_USER_AGENT: &str = "vscode-chat/dev";

/// Largest error-body excerpt kept for diagnostics.
const MAX_ERROR_BODY: usize = 2048;

/// One credential-for-token exchange.
///
/// Behind a trait so the scheduler can be driven by a scripted exchanger in
/// tests. Implementations never touch the token store; they return the parsed
/// token to the caller.
#[async_trait]
pub trait Exchange: Send + Sync + std::fmt::Debug {
    /// Exchange the long-lived credential for a fresh access token.
    async fn exchange(&self) -> Result<AccessToken>;
}

/// Shared exchanger handle for use across async contexts.
pub type SharedExchanger = Arc<dyn Exchange>;

/// HTTP implementation of [`Exchange`] against the fixed issuance endpoint.
#[derive(Debug, Clone)]
pub struct HttpExchanger {
    client: reqwest::Client,
    endpoint: String,
    credential: String,
    user_agent: String,
}

impl HttpExchanger {
    /// Create an exchanger for the default issuance endpoint.
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            credential: credential.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Override the issuance endpoint (used by tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[async_trait]
impl Exchange for HttpExchanger {
    async fn exchange(&self) -> Result<AccessToken> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", self.credential))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Transport(format!("Token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(format!("Failed to read token response: {}", e)))?;

        if status != reqwest::StatusCode::OK {
            return Err(AuthError::Refresh {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let token: AccessToken = serde_json::from_str(&body)
            .map_err(|e| AuthError::Decode(format!("Failed to parse token response: {}", e)))?;

        Ok(token)
    }
}

fn truncate(body: &str, limit: usize) -> String {
    if body.len() <= limit {
        return body.to_string();
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
