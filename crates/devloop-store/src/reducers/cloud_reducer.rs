//! Cloud Reducer

use crate::actions::{CloudStatusReceivedAction, CloudTokenChangedAction};
use crate::change_summary::{ChangeSummary, StateRegions};
use crate::state::EngineState;

pub fn reduce_status_received(
    state: &mut EngineState,
    status: &CloudStatusReceivedAction,
    summary: &mut ChangeSummary,
) {
    let cloud = &mut state.cloud_status;
    if status.is_post_registration_lookup {
        cloud.waiting_for_status_post_registration = false;
    }
    if status.found {
        cloud.username = status.username.clone();
        cloud.team_name = status.team_name.clone();
    } else {
        cloud.username.clear();
        cloud.team_name.clear();
    }
    cloud.suggested_version = status.suggested_version.clone();
    cloud.status_received = true;

    summary.mark(StateRegions::CLOUD);
}

pub fn reduce_token_changed(
    state: &mut EngineState,
    change: &CloudTokenChangedAction,
    summary: &mut ChangeSummary,
) {
    state.token = change.token.clone();
    state.team_id = change.team_id.clone();
    state.cloud_status.waiting_for_status_post_registration = change.post_registration;
    summary.mark(StateRegions::CLOUD);
}
