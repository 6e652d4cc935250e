//! Token lifecycle management for the tollgate proxy.
//!
//! Holds a long-lived credential, exchanges it for short-lived upstream
//! access tokens and keeps the current token fresh in the background.
//!
//! # Components
//!
//! - [`exchange`] — one credential-for-token round trip against the issuance endpoint
//! - [`store`] — concurrent single-writer/multi-reader token slot
//! - [`scheduler`] — background refresh loop with retry backoff and a safety-net tick
//! - [`credentials`] — long-lived credential discovery from `apps.json`

pub mod credentials;
pub mod error;
pub mod exchange;
pub mod scheduler;
pub mod store;
pub mod token;

pub use error::{AuthError, Result};
pub use exchange::{Exchange, HttpExchanger, SharedExchanger};
pub use scheduler::RefreshScheduler;
pub use store::TokenStore;
pub use token::AccessToken;
