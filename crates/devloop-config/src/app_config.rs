//! Application configuration
//!
//! Configuration loaded from devloop.toml.

use anyhow::{Context, Result};
use devloop_store::state::{AnalyticsOpt, TerminalMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration loaded from devloop.toml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Host the web UI binds to
    #[serde(default = "default_web_host")]
    pub web_host: String,

    /// Port of the web UI; 0 disables the browser UI
    #[serde(default = "default_web_port")]
    pub web_port: u16,

    /// Cloud server to look up the user's identity on
    #[serde(default = "default_cloud_address")]
    pub cloud_address: String,

    /// How the terminal renders output
    #[serde(default)]
    pub terminal_mode: TerminalMode,

    /// Name of the local cluster environment (e.g. "docker-desktop")
    #[serde(default = "default_env")]
    pub env: String,

    /// Analytics choice; "default" counts as opted in
    #[serde(default)]
    pub analytics_opt: AnalyticsOpt,

    /// Compose project files passed to `docker compose -f`
    #[serde(default)]
    pub compose_files: Vec<PathBuf>,
}

fn default_web_host() -> String {
    "localhost".to_string()
}

fn default_web_port() -> u16 {
    10350
}

fn default_cloud_address() -> String {
    "cloud.devloop.dev".to_string()
}

fn default_env() -> String {
    "unknown".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            web_host: default_web_host(),
            web_port: default_web_port(),
            cloud_address: default_cloud_address(),
            terminal_mode: TerminalMode::default(),
            env: default_env(),
            analytics_opt: AnalyticsOpt::default(),
            compose_files: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load config from CWD first, then the config directory, or use defaults
    pub fn load() -> Self {
        Self::try_load().unwrap_or_else(|e| {
            log::warn!("{:#}", e);
            Self::default()
        })
    }

    /// Like `load`, but a config file that doesn't parse is an error
    pub fn try_load() -> Result<Self> {
        let Some((path, content)) = crate::load_config_file() else {
            log::debug!("Using default app config");
            return Ok(Self::default());
        };
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        log::info!("Loaded app config from {}", path.display());
        Ok(config)
    }

    /// URL of the web UI, empty when it is disabled
    pub fn web_url(&self) -> String {
        if self.web_port == 0 {
            return String::new();
        }
        let host = if self.web_host == "0.0.0.0" {
            "localhost"
        } else {
            self.web_host.as_str()
        };
        format!("http://{}:{}/", host, self.web_port)
    }
}
