//! Actions module
//!
//! Every fact that changes engine state is an `Action`. Actions are plain
//! data: producers build them, the store queues them and the reducer is the
//! only code that interprets them.
//!
//! Payloads are grouped by region:
//! - `engine`: startup, builds, manifests and runtime observations
//! - `settings`: analytics opt, cloud identity, metrics, terminal mode

pub mod engine;
pub mod settings;

pub use engine::{
    BuildCompletedAction, ComposeStateChangedAction, ConfigLoadedAction,
    DisableStateChangedAction, InitAction, PodUpdatedAction,
};
pub use settings::{CloudStatusReceivedAction, CloudTokenChangedAction, MetricsModeAction};

use crate::state::{AnalyticsOpt, LogLine, Manifest, ManifestName, TerminalMode};
use strum::EnumDiscriminants;

/// Root action enum
///
/// `ActionKind` is the payload-free discriminant, used wherever code needs to
/// talk about "an action of this type" (tests waiting for an action, logs).
#[derive(Debug, Clone, EnumDiscriminants)]
#[strum_discriminants(name(ActionKind), derive(Hash, strum::IntoStaticStr))]
pub enum Action {
    // === Engine ===
    /// Engine finished wiring and is starting up
    Init(InitAction),
    /// Main config file (re)loaded
    ConfigLoaded(ConfigLoadedAction),
    /// A manifest was defined or redefined
    ManifestUpserted(Manifest),
    /// A manifest is gone from the config
    ManifestRemoved(ManifestName),
    /// A build finished, successfully or not
    BuildCompleted(BuildCompletedAction),
    /// The most recent pod of a manifest changed
    PodUpdated(PodUpdatedAction),
    /// A docker compose container changed
    ComposeStateChanged(ComposeStateChangedAction),
    /// A resource was enabled or disabled
    DisableStateChanged(DisableStateChangedAction),

    // === Settings ===
    /// User changed their analytics choice
    AnalyticsUserOpt(AnalyticsOpt),
    /// Cloud identity lookup returned
    CloudStatusReceived(CloudStatusReceivedAction),
    /// A new cloud token was registered
    CloudTokenChanged(CloudTokenChangedAction),
    /// Metrics exporter was switched
    MetricsMode(MetricsModeAction),
    /// User switched terminal rendering
    SwitchTerminalMode(TerminalMode),
    /// User asked to open the web UI
    OpenBrowser(String),

    // === Logs / errors ===
    /// Product-facing log line
    Log(LogLine),
    /// Unrecoverable error; the store stops after this batch
    Error(String),

    /// Action from a producer this reducer doesn't know about
    Extension {
        kind: String,
        payload: serde_json::Value,
    },

    /// No-op action
    None,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        ActionKind::from(self)
    }

    /// Factory for error actions
    pub fn error(err: impl std::fmt::Display) -> Action {
        Action::Error(err.to_string())
    }
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}
