use std::path::PathBuf;

/// Per-project config file, looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "devloop.toml";

/// Load config file content from CWD first, then the config directory
///
/// Searches for:
/// 1. `devloop.toml` in the current working directory
/// 2. `config.toml` in the devloop config directory
///
/// Returns the path and content of the first file found.
pub fn load_config_file() -> Option<(PathBuf, String)> {
    let candidates = [
        Some(PathBuf::from(LOCAL_CONFIG_FILE)),
        crate::paths::app_config_path().ok(),
    ];

    for path in candidates.into_iter().flatten() {
        if let Ok(content) = std::fs::read_to_string(&path) {
            log::debug!("Loaded config from {}", path.display());
            return Some((path, content));
        }
    }

    None
}
