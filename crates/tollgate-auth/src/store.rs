//! Shared store for the current access token.
//!
//! Single-writer, multi-reader: the refresh scheduler is the only component
//! that installs tokens; every proxied request reads concurrently. The whole
//! `(token, expires_at)` pair is replaced under one write lock so a reader
//! never observes a token value paired with a mismatched expiry.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::token::AccessToken;

/// Concurrent store holding at most one access token.
///
/// Cheap to clone; clones share the same underlying slot.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    current: Arc<RwLock<Option<AccessToken>>>,
}

impl TokenStore {
    /// Create an empty store. `ready()` is false until a token is installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a currently valid token is held.
    pub fn ready(&self) -> bool {
        self.current
            .read()
            .as_ref()
            .is_some_and(AccessToken::is_valid)
    }

    /// The `Authorization` header value for the current token, if valid.
    pub fn bearer(&self) -> Option<String> {
        let guard = self.current.read();
        let token = guard.as_ref()?;
        token.is_valid().then(|| format!("Bearer {}", token.token))
    }

    /// Replace the stored token. The previous token is discarded.
    ///
    /// Only the refresh scheduler should call this.
    pub fn install(&self, token: AccessToken) {
        *self.current.write() = Some(token);
    }

    /// Expiry of the stored token as Unix seconds, if any.
    pub fn expires_at(&self) -> Option<i64> {
        self.current.read().as_ref().map(|t| t.expires_at)
    }
}
