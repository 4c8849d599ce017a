//! Configuration and preference files for devloop
//!
//! This crate provides:
//! - Config and cache directory paths
//! - Configuration file loading (TOML)
//! - Application configuration (AppConfig)
//! - User preferences (JSON) behind the `PrefsStore` trait

pub mod app_config;
pub mod config_file;
pub mod paths;
pub mod user_prefs;

pub use app_config::AppConfig;
pub use config_file::load_config_file;
pub use user_prefs::{FilePrefs, MemoryPrefs, PrefsStore, UserPrefs};
