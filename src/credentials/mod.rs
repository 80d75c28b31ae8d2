pub mod prompt;

use keyring::Entry;
use std::fmt;

const SERVICE_NAME: &str = "scorekeeper";
const KEY_NAME: &str = "service-key";

/// Keyring account for the store at `url`: one key per project host.
///
/// Falls back to the bare key name when the url has no host.
pub fn account_for(url: &str) -> String {
    match reqwest::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase)) {
        Some(host) => format!("{}@{}", KEY_NAME, host),
        None => KEY_NAME.to_string(),
    }
}

/// Environment variable name for providing the data store key without keyring
pub const ENV_KEY_VAR: &str = "SCOREKEEPER_SERVICE_KEY";

// Re-export prompt functions for convenience
pub use prompt::{prompt_for_key, reprompt_for_key, setup_key_if_missing};

/// Check for a service key in the SCOREKEEPER_SERVICE_KEY environment variable.
/// Returns Some(key) if the env var is set and non-empty, None otherwise.
pub fn get_key_from_env() -> Option<String> {
    std::env::var(ENV_KEY_VAR).ok().and_then(|val| non_empty(&val))
}

fn non_empty(val: &str) -> Option<String> {
    let trimmed = val.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug)]
pub enum CredentialError {
    KeyringUnavailable(String),
    KeyNotFound,
    StoreFailed(String),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::KeyringUnavailable(msg) => write!(f, "Keyring unavailable: {}", msg),
            CredentialError::KeyNotFound => write!(f, "Service key not found in keyring"),
            CredentialError::StoreFailed(msg) => write!(f, "Failed to store service key: {}", msg),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Synchronous version of get_key - retrieves the key from system keyring
fn get_key_sync(account: &str) -> Result<String, CredentialError> {
    let entry = Entry::new(SERVICE_NAME, account)
        .map_err(|e| CredentialError::KeyringUnavailable(format!("{}", e)))?;

    entry.get_password().map_err(|e| match e {
        keyring::Error::NoEntry => CredentialError::KeyNotFound,
        _ => CredentialError::KeyringUnavailable(format!("{}", e)),
    })
}

/// Synchronous version of store_key - stores the key in system keyring
fn store_key_sync(account: &str, key: &str) -> Result<(), CredentialError> {
    let entry = Entry::new(SERVICE_NAME, account)
        .map_err(|e| CredentialError::KeyringUnavailable(format!("{}", e)))?;

    entry
        .set_password(key)
        .map_err(|e| CredentialError::StoreFailed(format!("{}", e)))?;

    Ok(())
}

/// Retrieve the key stored for the data store at `url`
/// Uses spawn_blocking to prevent blocking the async runtime
pub async fn get_key(url: &str) -> Result<String, CredentialError> {
    let account = account_for(url);
    tokio::task::spawn_blocking(move || get_key_sync(&account))
        .await
        .map_err(|e| CredentialError::KeyringUnavailable(format!("Task join error: {}", e)))?
}

/// Store `key` for the data store at `url`
/// Uses spawn_blocking to prevent blocking the async runtime
pub async fn store_key(url: &str, key: String) -> Result<(), CredentialError> {
    let account = account_for(url);
    tokio::task::spawn_blocking(move || store_key_sync(&account, &key))
        .await
        .map_err(|e| CredentialError::KeyringUnavailable(format!("Task join error: {}", e)))?
}
