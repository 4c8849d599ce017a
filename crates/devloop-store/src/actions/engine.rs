//! Engine actions
//!
//! Startup, build and runtime facts reported by the (external) build and
//! deploy executors.

use crate::state::{
    AnalyticsOpt, BuildInfo, ComposeState, DisableState, ManifestName, Pod, TerminalMode,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Initial settings, dispatched once wiring is done
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitAction {
    pub start_time: DateTime<Utc>,
    pub terminal_mode: TerminalMode,
    pub analytics_user_opt: AnalyticsOpt,
    pub cloud_address: String,
    pub token: String,
    pub team_id: String,
    pub build_info: BuildInfo,
    pub web_url: String,
    pub env: String,
}

/// Result of loading the main config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLoadedAction {
    pub error: Option<String>,
    pub features: BTreeMap<String, bool>,
    pub team_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildCompletedAction {
    pub manifest: ManifestName,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodUpdatedAction {
    pub manifest: ManifestName,
    /// `None` when the pod went away
    pub pod: Option<Pod>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeStateChangedAction {
    pub manifest: ManifestName,
    pub state: ComposeState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisableStateChangedAction {
    pub manifest: ManifestName,
    pub disable_state: DisableState,
}
