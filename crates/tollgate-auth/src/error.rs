//! Error types for token lifecycle management.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while obtaining or refreshing access tokens.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Network/TLS/DNS failure reaching the token issuance endpoint.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Token issuance endpoint answered with a non-200 status.
    #[error("Token refresh failed (status {status}): {body}")]
    Refresh {
        /// HTTP status returned by the issuance endpoint.
        status: u16,
        /// Response body, truncated for diagnostics.
        body: String,
    },

    /// Issuance response did not parse as the expected token payload.
    #[error("Malformed token response: {0}")]
    Decode(String),

    /// Long-lived credential could not be obtained.
    #[error("Credential error: {0}")]
    Credentials(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Transport(e.to_string())
    }
}
