//! Configuration and data directory paths
//!
//! Uses XDG directories via `dirs` crate.
//!
//! Platform-specific locations:
//! - Linux: `~/.config/devloop/`, `~/.cache/devloop/`
//! - macOS: `~/Library/Application Support/devloop/`, `~/Library/Caches/devloop/`
//! - Windows: `%APPDATA%\devloop\`, `%LOCALAPPDATA%\devloop\`

use anyhow::{Context, Result};
use std::path::PathBuf;

pub const APP_NAME: &str = "devloop";

/// Get the application config directory, creating it if needed
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
    Ok(dir)
}

/// Get the application cache directory, creating it if needed
pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine cache directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
    Ok(dir)
}

/// Get path to the global app config file
pub fn app_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get path to the user preferences file
pub fn prefs_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("prefs.json"))
}

/// Get path to the stored analytics choice
pub fn analytics_opt_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("analytics-opt"))
}

/// Get path to the stored cloud token
pub fn token_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("token"))
}
