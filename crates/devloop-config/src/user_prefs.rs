//! User preferences
//!
//! Small per-user settings changed from inside devloop (as opposed to the
//! config file, which the user edits). Stored as JSON in the config dir.

use anyhow::{Context, Result};
use devloop_store::state::MetricsMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrefs {
    #[serde(default)]
    pub metrics_mode: MetricsMode,
}

/// Where user preferences are read from and written to
pub trait PrefsStore: Send + Sync {
    fn load(&self) -> Result<UserPrefs>;
    fn save(&self, prefs: &UserPrefs) -> Result<()>;
}

/// Preferences stored in a JSON file
#[derive(Debug, Clone)]
pub struct FilePrefs {
    path: PathBuf,
}

impl FilePrefs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Preferences in the default location
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::paths::prefs_path()?))
    }
}

impl PrefsStore for FilePrefs {
    /// A missing file means no preferences yet
    fn load(&self) -> Result<UserPrefs> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(UserPrefs::default());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read preferences from {}", self.path.display())
                });
            }
        };
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse preferences in {}", self.path.display()))
    }

    fn save(&self, prefs: &UserPrefs) -> Result<()> {
        let content = serde_json::to_string_pretty(prefs)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write preferences to {}", self.path.display()))?;
        log::debug!("Saved preferences to {}", self.path.display());
        Ok(())
    }
}

/// In-memory preferences, for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryPrefs {
    prefs: Mutex<UserPrefs>,
    saves: Mutex<usize>,
}

impl MemoryPrefs {
    pub fn new(prefs: UserPrefs) -> Self {
        Self {
            prefs: Mutex::new(prefs),
            saves: Mutex::new(0),
        }
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PrefsStore for MemoryPrefs {
    fn load(&self) -> Result<UserPrefs> {
        Ok(self
            .prefs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, prefs: &UserPrefs) -> Result<()> {
        *self.prefs.lock().unwrap_or_else(PoisonError::into_inner) = prefs.clone();
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
