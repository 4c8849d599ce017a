//! Engine State Module
//!
//! `EngineState` is the single aggregate owned by the store. It is split into
//! regions (builds, analytics, cloud, metrics, terminal, logs) so reducers and
//! change summaries can talk about them independently.

mod log_store;
mod manifest;
mod settings;

pub use log_store::{LogLevel, LogLine, LogStore, DEFAULT_LOG_CAPACITY};
pub use manifest::{
    ComposeState, DisableState, Manifest, ManifestKind, ManifestName, ManifestState,
    ManifestTarget, Pod, PodCondition, CONDITION_FALSE, CONDITION_TRUE, POD_INITIALIZED,
    POD_READY, POD_SCHEDULED,
};
pub use settings::{
    AnalyticsOpt, BuildInfo, CloudStatus, MetricsMode, MetricsServing, MetricsSettings,
    TerminalMode,
};

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// The whole engine state
///
/// Only the store's reduction worker mutates this. Everyone else reads it
/// through a read guard and changes it by dispatching actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineState {
    // === builds / runtime ===
    /// Set once the engine has finished starting up
    pub start_time: Option<DateTime<Utc>>,
    /// Builds completed (pass or fail) since start
    pub completed_build_count: usize,
    /// Manifest names in the order they were defined
    pub manifest_definition_order: Vec<ManifestName>,
    pub manifest_targets: BTreeMap<ManifestName, ManifestTarget>,
    /// Error from the last load of the main config file
    pub main_config_error: Option<String>,

    // === features ===
    pub features: BTreeMap<String, bool>,

    // === analytics ===
    pub analytics_user_opt: AnalyticsOpt,

    // === cloud ===
    pub cloud_address: String,
    pub token: String,
    pub team_id: String,
    pub build_info: BuildInfo,
    pub cloud_status: CloudStatus,

    // === metrics ===
    pub metrics_serving: MetricsServing,
    pub metrics_settings: MetricsSettings,

    // === terminal ===
    pub terminal_mode: TerminalMode,
    pub web_url: String,
    pub env: String,

    // === logs ===
    pub log_store: LogStore,

    /// Set when something dispatched a fatal error; the store stops afterwards
    pub fatal_error: Option<String>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets in definition order; targets missing from the order come last
    pub fn targets(&self) -> Vec<&ManifestTarget> {
        let mut result: Vec<&ManifestTarget> = self
            .manifest_definition_order
            .iter()
            .filter_map(|name| self.manifest_targets.get(name))
            .collect();
        for (name, target) in &self.manifest_targets {
            if !self.manifest_definition_order.contains(name) {
                result.push(target);
            }
        }
        result
    }

    pub fn manifest_target(&self, name: &ManifestName) -> Option<&ManifestTarget> {
        self.manifest_targets.get(name)
    }

    /// Insert or replace a manifest target, keeping definition order
    pub fn upsert_manifest_target(&mut self, target: ManifestTarget) {
        let name = target.name().clone();
        if !self.manifest_definition_order.contains(&name) {
            self.manifest_definition_order.push(name.clone());
        }
        self.manifest_targets.insert(name, target);
    }

    pub fn remove_manifest_target(&mut self, name: &ManifestName) -> Option<ManifestTarget> {
        self.manifest_definition_order.retain(|n| n != name);
        self.manifest_targets.remove(name)
    }

    /// Opt that actually applies; "no choice" counts as opted in
    pub fn analytics_effective_opt(&self) -> AnalyticsOpt {
        match self.analytics_user_opt {
            AnalyticsOpt::OptOut => AnalyticsOpt::OptOut,
            _ => AnalyticsOpt::OptIn,
        }
    }

    pub fn is_feature_enabled(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }
}
