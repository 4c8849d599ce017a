//! Cloud token resolution

use std::path::PathBuf;

/// Environment variable that overrides the stored token
pub const TOKEN_ENV_VAR: &str = "DEVLOOP_TOKEN";

/// Resolves the cloud token
///
/// # Token Resolution Order
///
/// 1. `DEVLOOP_TOKEN` env var
/// 2. The token file (first line, trimmed)
#[derive(Debug, Clone, Default)]
pub struct TokenResolver {
    env_token: Option<String>,
    token_file: Option<PathBuf>,
}

impl TokenResolver {
    pub fn new(token_file: Option<PathBuf>) -> Self {
        let env_token = std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty());
        Self {
            env_token,
            token_file,
        }
    }

    /// The token, or an empty string when none is configured
    pub fn resolve(&self) -> String {
        if let Some(token) = &self.env_token {
            log::debug!("Using cloud token from {}", TOKEN_ENV_VAR);
            return token.trim().to_string();
        }

        let Some(path) = &self.token_file else {
            return String::new();
        };
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let token = content.lines().next().unwrap_or_default().trim().to_string();
                log::debug!("Using cloud token from {}", path.display());
                token
            }
            Err(e) => {
                log::debug!("No cloud token at {}: {}", path.display(), e);
                String::new()
            }
        }
    }
}
