pub mod init;
mod schema;

pub use schema::{Config, PointsConfig, StoreConfig, DEFAULT_FOCUS_COUNT};

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the config directory path (~/.config/scorekeeper/)
pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("scorekeeper"))
}

/// Get the default config file path (~/.config/scorekeeper/config.yaml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.yaml"))
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses default path (~/.config/scorekeeper/config.yaml)
///
/// # Errors
///
/// Returns an error if:
/// - The config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => p,
        None => get_config_path()?,
    };

    if !config_path.exists() {
        anyhow::bail!(
            "Config file not found at {}. Run `scorekeeper init` to create one",
            config_path.display()
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))?;

    Ok(config)
}

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    match reqwest::Url::parse(&config.store.url) {
        Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
            errors.push(format!("store.url: unsupported scheme '{}'", url.scheme()));
        }
        Ok(_) => {}
        Err(e) => errors.push(format!("store.url: invalid '{}' - {}", config.store.url, e)),
    }

    if let Some(schema) = &config.store.schema {
        if schema.trim().is_empty() {
            errors.push("store.schema: must not be empty".to_string());
        }
    }

    if config.focus_count == Some(0) {
        errors.push("focus_count: must be at least 1".to_string());
    }

    if config.points_procedure().trim().is_empty() {
        errors.push("points.procedure: must not be empty".to_string());
    }

    match config.points_interval() {
        Ok(d) if d.is_zero() => errors.push("points.interval: must be longer than zero".to_string()),
        Ok(_) => {}
        Err(e) => errors.push(format!(
            "points.interval: invalid format '{}' - {}",
            config.points_interval_str(),
            e
        )),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
