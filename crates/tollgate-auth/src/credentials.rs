//! Long-lived credential discovery.
//!
//! When no credential is supplied explicitly, the editor's `apps.json` is
//! consulted: a JSON object whose values each carry an `oauth_token`. The
//! first entry's token is used.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AuthError, Result};

/// `apps.json` location relative to the user config directory.
const APPS_JSON: &str = "github-copilot/apps.json";

#[derive(Debug, Deserialize)]
struct AppEntry {
    oauth_token: String,
}

/// Default `apps.json` path, if a config directory exists for this user.
pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APPS_JSON))
}

/// Read the long-lived credential from the default `apps.json` location.
pub fn load_default_credential() -> Result<String> {
    let path = default_credentials_path()
        .ok_or_else(|| AuthError::Credentials("no config directory for this user".to_string()))?;
    load_credential_from(&path)
}

/// Read the long-lived credential from an `apps.json` file.
pub fn load_credential_from(path: &Path) -> Result<String> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        AuthError::Credentials(format!("failed to read {}: {}", path.display(), e))
    })?;

    // BTreeMap keeps "first value" deterministic across runs.
    let entries: BTreeMap<String, AppEntry> = serde_json::from_str(&data).map_err(|e| {
        AuthError::Credentials(format!("failed to parse {}: {}", path.display(), e))
    })?;

    entries
        .into_values()
        .next()
        .map(|entry| entry.oauth_token)
        .ok_or_else(|| {
            AuthError::Credentials(format!("no OAuth token found in {}", path.display()))
        })
}
