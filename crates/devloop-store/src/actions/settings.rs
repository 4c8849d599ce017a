//! Settings actions: cloud identity and metrics

use crate::state::{MetricsServing, MetricsSettings};

/// Response of a cloud identity lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudStatusReceivedAction {
    pub found: bool,
    pub username: String,
    pub team_name: String,
    pub suggested_version: String,
    /// True when this was the blocking lookup made right after registration
    pub is_post_registration_lookup: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudTokenChangedAction {
    pub token: String,
    pub team_id: String,
    /// The token was just registered; wait for the cloud to confirm it
    pub post_registration: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsModeAction {
    pub serving: MetricsServing,
    pub settings: MetricsSettings,
}
