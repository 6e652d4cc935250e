//! Short-lived access token data model.

use serde::{Deserialize, Serialize};

/// A short-lived bearer token issued by the upstream in exchange for the
/// long-lived credential.
///
/// Deserialized directly from the issuance endpoint's JSON payload. Unknown
/// fields are ignored so upstream additions don't break the decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Opaque bearer value, used verbatim in the `Authorization` header.
    pub token: String,

    /// Absolute expiry as Unix seconds. The token must not be used at or
    /// after this instant.
    pub expires_at: i64,

    /// Upstream-suggested delay in seconds before requesting a new token.
    /// Drives scheduling only; not a hard deadline.
    pub refresh_in: i64,
}

impl AccessToken {
    /// Whether the token is valid at the given instant (Unix seconds).
    ///
    /// An unset/zero expiry is never valid.
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.expires_at > now
    }

    /// Whether the token is valid right now.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(chrono::Utc::now().timestamp())
    }
}
