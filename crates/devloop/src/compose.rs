//! Docker Compose service removal

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Stops and removes compose services
#[async_trait]
pub trait ServiceRemover: Send + Sync {
    async fn rm(&self, services: &[String]) -> Result<()>;
}

/// Removes services with the `docker compose` CLI
#[derive(Debug, Clone)]
pub struct ComposeCli {
    project_files: Vec<PathBuf>,
}

impl ComposeCli {
    pub fn new(project_files: Vec<PathBuf>) -> Self {
        Self { project_files }
    }

    fn rm_args(&self, services: &[String]) -> Vec<String> {
        let mut args = vec!["compose".to_string()];
        for file in &self.project_files {
            args.push("-f".to_string());
            args.push(file.to_string_lossy().to_string());
        }
        args.extend(["rm", "-s", "-f"].map(String::from));
        args.extend(services.iter().cloned());
        args
    }
}

#[async_trait]
impl ServiceRemover for ComposeCli {
    async fn rm(&self, services: &[String]) -> Result<()> {
        let args = self.rm_args(services);
        log::debug!("Running docker {}", args.join(" "));

        let output = tokio::process::Command::new("docker")
            .args(&args)
            .output()
            .await
            .context("Failed to run 'docker compose rm'")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("docker compose rm failed: {}", stderr.trim());
        }
        Ok(())
    }
}
