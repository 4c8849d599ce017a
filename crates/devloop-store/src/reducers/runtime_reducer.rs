//! Runtime Reducer
//!
//! Observations about running resources: pods, compose containers and the
//! enable/disable switch.

use crate::actions::{ComposeStateChangedAction, DisableStateChangedAction, PodUpdatedAction};
use crate::change_summary::{ChangeSummary, StateRegions};
use crate::state::{EngineState, ManifestName, ManifestState};

/// Apply `f` to the runtime state of `name`, if it still exists
fn update_target(
    state: &mut EngineState,
    name: &ManifestName,
    summary: &mut ChangeSummary,
    f: impl FnOnce(&mut ManifestState),
) {
    match state.manifest_targets.get_mut(name) {
        Some(target) => {
            f(&mut target.state);
            summary.mark_manifest(StateRegions::RUNTIME, name);
        }
        None => log::debug!("Ignoring runtime update for unknown manifest {}", name),
    }
}

pub fn reduce_pod_updated(
    state: &mut EngineState,
    update: &PodUpdatedAction,
    summary: &mut ChangeSummary,
) {
    update_target(state, &update.manifest, summary, |ms| {
        ms.most_recent_pod = update.pod.clone();
    });
}

pub fn reduce_compose_state(
    state: &mut EngineState,
    change: &ComposeStateChangedAction,
    summary: &mut ChangeSummary,
) {
    update_target(state, &change.manifest, summary, |ms| {
        ms.compose = Some(change.state.clone());
    });
}

pub fn reduce_disable_state(
    state: &mut EngineState,
    change: &DisableStateChangedAction,
    summary: &mut ChangeSummary,
) {
    update_target(state, &change.manifest, summary, |ms| {
        ms.disable_state = change.disable_state;
    });
}
