//! Small settings regions: analytics opt, cloud identity, metrics and terminal mode

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{Display, EnumString};

/// The user's analytics choice
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AnalyticsOpt {
    /// No explicit choice; treated as opted in
    #[default]
    Default,
    OptIn,
    OptOut,
}

/// Build stamp of the running binary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub date: String,
}

impl BuildInfo {
    /// Human readable stamp, e.g. "v0.1.0, built 2026-01-01"
    pub fn human_stamp(&self) -> String {
        let version = if self.version.is_empty() {
            "unknown".to_string()
        } else {
            format!("v{}", self.version.trim_start_matches('v'))
        };
        if self.date.is_empty() {
            version
        } else {
            format!("{}, built {}", version, self.date)
        }
    }
}

/// What the cloud told us about the current user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudStatus {
    pub username: String,
    pub team_name: String,
    pub suggested_version: String,
    pub status_received: bool,
    /// Set when the user just registered a token and we must wait for the
    /// cloud to confirm it
    pub waiting_for_status_post_registration: bool,
}

/// Where metrics are sent
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MetricsMode {
    #[default]
    Default,
    Local,
    Disabled,
}

/// How metrics are being served to the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsServing {
    pub mode: MetricsMode,
    /// Externally reachable dashboard address
    pub grafana_host: String,
}

/// Exporter configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub address: String,
    pub insecure: bool,
    pub reporting_period: Duration,
    pub allow_anonymous: bool,
}

/// How the terminal renders output
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TerminalMode {
    #[default]
    Prompt,
    Stream,
    Hud,
}

impl TerminalMode {
    /// Numeric code used in analytics tags
    pub fn code(&self) -> u8 {
        match self {
            TerminalMode::Prompt => 0,
            TerminalMode::Stream => 1,
            TerminalMode::Hud => 2,
        }
    }
}
