//! Browser utilities
//!
//! Functions for opening URLs in the system's default browser.

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Opens URLs for the user
#[async_trait]
pub trait UrlOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<()>;
}

/// Opens URLs in the system's default browser
#[derive(Debug, Default)]
pub struct SystemBrowser;

#[async_trait]
impl UrlOpener for SystemBrowser {
    async fn open(&self, url: &str) -> Result<()> {
        open_url(url).await
    }
}

/// Open a URL in the system's default browser
///
/// Uses platform-specific commands:
/// - macOS: `open`
/// - Linux: `xdg-open`
/// - Windows: `cmd /C start`
pub async fn open_url(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    let result = tokio::process::Command::new("open").arg(url).spawn();

    #[cfg(target_os = "windows")]
    let result = tokio::process::Command::new("cmd")
        .args(["/C", "start", url])
        .spawn();

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let result = tokio::process::Command::new("xdg-open").arg(url).spawn();

    result
        .map(|_| ())
        .with_context(|| format!("Failed to open {} in browser", url))
}
