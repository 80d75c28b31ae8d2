use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::config::{get_config_path, validate_config, Config};

/// Prompt user with a message and return their trimmed input.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout()
        .flush()
        .context("Failed to flush stdout")?;
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt user with a message and a default value. Returns default if input is empty.
fn prompt_with_default(message: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}]: ", message, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

/// Write `config` to `path` atomically, creating parent directories.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn write_config(path: &Path, config: &Config, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Pass --force to overwrite",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory at {}", parent.display()))?;
    }

    let yaml = serde_saphyr::to_string(config).context("Failed to serialize config")?;

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    file.write_all(yaml.as_bytes())
        .context("Failed to write config")?;
    file.commit().context("Failed to save config")?;

    Ok(())
}

/// Create a config file, prompting for the store url when `url` is None.
///
/// Returns the path written.
pub fn run_init(path: Option<PathBuf>, url: Option<String>, force: bool) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p,
        None => get_config_path()?,
    };

    let config = loop {
        let candidate = match &url {
            Some(u) => u.clone(),
            None => prompt_with_default("Data store url", "https://your-project.supabase.co")?,
        };
        let config = Config::new(candidate);
        match validate_config(&config) {
            Ok(()) => break config,
            // A url passed on the command line cannot be re-entered
            Err(errors) if url.is_some() => {
                anyhow::bail!("Invalid config: {}", errors.join("; "));
            }
            Err(errors) => {
                for error in errors {
                    println!("  Invalid: {}. Try again.", error);
                }
            }
        }
    };

    write_config(&path, &config, force)?;
    Ok(path)
}
