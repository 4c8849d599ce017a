//! Build Reducer
//!
//! Startup, config loads, manifest definitions and build results.

use crate::actions::{BuildCompletedAction, ConfigLoadedAction, InitAction};
use crate::change_summary::{ChangeSummary, StateRegions};
use crate::state::{EngineState, Manifest, ManifestName, ManifestTarget};

pub fn reduce_init(state: &mut EngineState, init: &InitAction, summary: &mut ChangeSummary) {
    state.start_time = Some(init.start_time);
    state.terminal_mode = init.terminal_mode;
    state.analytics_user_opt = init.analytics_user_opt;
    state.cloud_address = init.cloud_address.clone();
    state.token = init.token.clone();
    state.team_id = init.team_id.clone();
    state.build_info = init.build_info.clone();
    state.web_url = init.web_url.clone();
    state.env = init.env.clone();

    summary.mark(
        StateRegions::BUILDS
            | StateRegions::ANALYTICS
            | StateRegions::CLOUD
            | StateRegions::TERMINAL,
    );
}

pub fn reduce_config_loaded(
    state: &mut EngineState,
    loaded: &ConfigLoadedAction,
    summary: &mut ChangeSummary,
) {
    state.main_config_error = loaded.error.clone();
    state.features = loaded.features.clone();
    summary.mark(StateRegions::CONFIG | StateRegions::FEATURES);

    if state.team_id != loaded.team_id {
        state.team_id = loaded.team_id.clone();
        summary.mark(StateRegions::CLOUD);
    }
}

/// Define or redefine a manifest; runtime state of an existing target is kept
pub fn reduce_manifest_upserted(
    state: &mut EngineState,
    manifest: &Manifest,
    summary: &mut ChangeSummary,
) {
    let target = match state.manifest_target(&manifest.name) {
        Some(existing) => ManifestTarget {
            manifest: manifest.clone(),
            state: existing.state.clone(),
        },
        None => ManifestTarget::new(manifest.clone()),
    };
    state.upsert_manifest_target(target);
    summary.mark_manifest(StateRegions::RUNTIME, &manifest.name);
}

pub fn reduce_manifest_removed(
    state: &mut EngineState,
    name: &ManifestName,
    summary: &mut ChangeSummary,
) {
    if state.remove_manifest_target(name).is_some() {
        summary.mark_manifest(StateRegions::RUNTIME, name);
    }
}

pub fn reduce_build_completed(
    state: &mut EngineState,
    build: &BuildCompletedAction,
    summary: &mut ChangeSummary,
) {
    state.completed_build_count += 1;

    match state.manifest_targets.get_mut(&build.manifest) {
        Some(target) => {
            target.state.build_count += 1;
            target.state.last_build_error = build.error.clone();
            summary.mark_manifest(StateRegions::BUILDS, &build.manifest);
        }
        None => {
            log::debug!("Build completed for unknown manifest {}", build.manifest);
            summary.mark(StateRegions::BUILDS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DisableState, ManifestKind};

    #[test]
    fn test_upsert_keeps_runtime_state() {
        let mut state = EngineState::new();
        let mut summary = ChangeSummary::default();
        state.upsert_manifest_target(
            ManifestTarget::new(Manifest::new("api", ManifestKind::Kubernetes))
                .with_disable_state(DisableState::Disabled),
        );

        let redefined = Manifest::new("api", ManifestKind::Kubernetes).with_label("team", "core");
        reduce_manifest_upserted(&mut state, &redefined, &mut summary);

        let target = state.manifest_target(&ManifestName::from("api")).cloned();
        let target = target.expect("target exists");
        assert_eq!(target.state.disable_state, DisableState::Disabled);
        assert_eq!(target.manifest.labels.get("team").map(String::as_str), Some("core"));
        assert!(summary.touches_manifest(&ManifestName::from("api")));
    }

    #[test]
    fn test_build_completed_counts() {
        let mut state = EngineState::new();
        let mut summary = ChangeSummary::default();
        state.upsert_manifest_target(ManifestTarget::new(Manifest::new(
            "api",
            ManifestKind::Local,
        )));

        reduce_build_completed(
            &mut state,
            &BuildCompletedAction {
                manifest: ManifestName::from("api"),
                error: Some("exit 1".to_string()),
            },
            &mut summary,
        );
        reduce_build_completed(
            &mut state,
            &BuildCompletedAction {
                manifest: ManifestName::from("gone"),
                error: None,
            },
            &mut summary,
        );

        assert_eq!(state.completed_build_count, 2);
        let api = &state.manifest_targets[&ManifestName::from("api")];
        assert_eq!(api.state.build_count, 1);
        assert_eq!(api.state.last_build_error.as_deref(), Some("exit 1"));
        assert!(summary.touches(StateRegions::BUILDS));
    }

    #[test]
    fn test_config_loaded_marks_cloud_only_on_team_change() {
        let mut state = EngineState::new();
        let mut summary = ChangeSummary::default();
        reduce_config_loaded(&mut state, &ConfigLoadedAction::default(), &mut summary);
        assert!(!summary.touches(StateRegions::CLOUD));

        reduce_config_loaded(
            &mut state,
            &ConfigLoadedAction {
                team_id: "team-1".to_string(),
                ..Default::default()
            },
            &mut summary,
        );
        assert!(summary.touches(StateRegions::CLOUD));
        assert_eq!(state.team_id, "team-1");
    }
}
