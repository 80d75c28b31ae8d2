use anyhow::{Context, Result};

use super::{get_key, get_key_from_env, store_key, CredentialError, ENV_KEY_VAR};

/// Prompts user to enter the service key for the data store at `url`
pub fn prompt_for_key(url: &str) -> Result<String> {
    println!("Service key required for {}.", url);
    println!("Find it in your project's API settings.");
    println!("To skip the keyring, set {} instead.", ENV_KEY_VAR);
    println!();

    let key = rpassword::prompt_password("Enter service key: ")
        .context("Failed to read service key from stdin")?;

    let key = key.trim();

    if key.is_empty() {
        anyhow::bail!("Service key cannot be empty");
    }

    Ok(key.to_string())
}

/// Re-prompts for the key when the stored one is rejected by the data store
pub async fn reprompt_for_key(url: &str) -> Result<String> {
    eprintln!();
    eprintln!("Your service key was rejected (invalid or revoked).");
    eprintln!("Please provide a new key.");
    eprintln!();

    let key = prompt_for_key(url)?;

    store_key(url, key.clone())
        .await
        .context("Failed to store new service key in keyring")?;

    eprintln!("New service key stored securely in system keyring.");

    Ok(key)
}

/// Resolve the service key for the store at `url`: environment first, then
/// the keyring entry for that host, then a prompt whose answer is stored in
/// the keyring for next time.
pub async fn setup_key_if_missing(url: &str) -> Result<String> {
    if let Some(key) = get_key_from_env() {
        tracing::debug!("using service key from {}", ENV_KEY_VAR);
        return Ok(key);
    }

    match get_key(url).await {
        Ok(key) => Ok(key),
        Err(CredentialError::KeyNotFound) => {
            let key = prompt_for_key(url)?;

            store_key(url, key.clone())
                .await
                .context("Failed to store service key in keyring")?;

            println!("Service key stored securely in system keyring.");

            Ok(key)
        }
        Err(CredentialError::KeyringUnavailable(msg)) => {
            anyhow::bail!(
                "System keyring unavailable. Set {} or enable a secure keyring \
                (macOS Keychain, Windows Credential Store, or Linux Secret Service).\n\
                Error: {}",
                ENV_KEY_VAR,
                msg
            );
        }
        Err(e) => {
            anyhow::bail!("Failed to access keyring: {}", e);
        }
    }
}
