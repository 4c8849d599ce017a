//! Per-resource build and runtime state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kubernetes pod condition types the rollout monitor cares about
pub const POD_SCHEDULED: &str = "PodScheduled";
pub const POD_INITIALIZED: &str = "Initialized";
pub const POD_READY: &str = "Ready";

/// Kubernetes condition status values
pub const CONDITION_TRUE: &str = "True";
pub const CONDITION_FALSE: &str = "False";

/// Name of a manifest (one deployable resource)
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ManifestName(String);

impl ManifestName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ManifestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ManifestName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ManifestName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// How a manifest gets deployed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManifestKind {
    #[default]
    Kubernetes,
    DockerCompose,
    Local,
}

/// Static description of a manifest, as produced by the config loader
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub name: ManifestName,
    pub kind: ManifestKind,
    pub labels: BTreeMap<String, String>,
    /// Whether any image is built for this manifest
    pub has_image: bool,
    /// Whether any image target carries a live-update spec
    pub has_live_update: bool,
}

impl Manifest {
    pub fn new(name: impl Into<ManifestName>, kind: ManifestKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_image(mut self, live_update: bool) -> Self {
        self.has_image = true;
        self.has_live_update = self.has_live_update || live_update;
        self
    }

    pub fn is_k8s(&self) -> bool {
        self.kind == ManifestKind::Kubernetes
    }

    pub fn is_docker_compose(&self) -> bool {
        self.kind == ManifestKind::DockerCompose
    }

    pub fn is_local(&self) -> bool {
        self.kind == ManifestKind::Local
    }
}

/// Whether a resource is enabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisableState {
    #[default]
    Pending,
    Enabled,
    Disabled,
}

/// One pod condition as reported by the cluster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodCondition {
    /// Condition type, e.g. "PodScheduled"
    pub kind: String,
    /// "True", "False" or empty when unknown
    pub status: String,
    pub reason: String,
    pub message: String,
    pub last_transition_time: Option<DateTime<Utc>>,
}

/// The most recent pod observed for a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pod {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub conditions: Vec<PodCondition>,
}

/// Runtime state of a docker compose service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeState {
    /// Container status, e.g. "running" or "exited"
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
}

impl ComposeState {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// Mutable per-manifest state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestState {
    pub disable_state: DisableState,
    pub most_recent_pod: Option<Pod>,
    pub compose: Option<ComposeState>,
    pub build_count: usize,
    pub last_build_error: Option<String>,
}

/// A manifest together with its runtime state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestTarget {
    pub manifest: Manifest,
    pub state: ManifestState,
}

impl ManifestTarget {
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            state: ManifestState::default(),
        }
    }

    pub fn with_disable_state(mut self, disable_state: DisableState) -> Self {
        self.state.disable_state = disable_state;
        self
    }

    pub fn with_pod(mut self, pod: Pod) -> Self {
        self.state.most_recent_pod = Some(pod);
        self
    }

    pub fn with_compose(mut self, compose: ComposeState) -> Self {
        self.state.compose = Some(compose);
        self
    }

    pub fn name(&self) -> &ManifestName {
        &self.manifest.name
    }
}
