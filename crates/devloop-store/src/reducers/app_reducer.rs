use crate::actions::Action;
use crate::change_summary::ChangeSummary;
use crate::reducers::{
    build_reducer, cloud_reducer, log_reducer, runtime_reducer, settings_reducer,
};
use crate::state::EngineState;

/// Root reducer
///
/// Mutates `state` in place; the store holds the write lock for the duration
/// of one call. Adding an `Action` variant means adding one arm here.
pub fn reduce(state: &mut EngineState, action: &Action, summary: &mut ChangeSummary) {
    match action {
        // Engine
        Action::Init(init) => build_reducer::reduce_init(state, init, summary),
        Action::ConfigLoaded(loaded) => build_reducer::reduce_config_loaded(state, loaded, summary),
        Action::ManifestUpserted(manifest) => {
            build_reducer::reduce_manifest_upserted(state, manifest, summary)
        }
        Action::ManifestRemoved(name) => {
            build_reducer::reduce_manifest_removed(state, name, summary)
        }
        Action::BuildCompleted(build) => {
            build_reducer::reduce_build_completed(state, build, summary)
        }
        Action::PodUpdated(update) => runtime_reducer::reduce_pod_updated(state, update, summary),
        Action::ComposeStateChanged(change) => {
            runtime_reducer::reduce_compose_state(state, change, summary)
        }
        Action::DisableStateChanged(change) => {
            runtime_reducer::reduce_disable_state(state, change, summary)
        }

        // Settings
        Action::AnalyticsUserOpt(opt) => settings_reducer::reduce_analytics_opt(state, *opt, summary),
        Action::CloudStatusReceived(status) => {
            cloud_reducer::reduce_status_received(state, status, summary)
        }
        Action::CloudTokenChanged(change) => {
            cloud_reducer::reduce_token_changed(state, change, summary)
        }
        Action::MetricsMode(mode) => settings_reducer::reduce_metrics_mode(state, mode, summary),
        Action::SwitchTerminalMode(mode) => {
            settings_reducer::reduce_terminal_mode(state, *mode, summary)
        }

        // Logs / errors
        Action::OpenBrowser(url) => log_reducer::reduce_open_browser(state, url, summary),
        Action::Log(line) => log_reducer::reduce_log(state, line, summary),
        Action::Error(message) => log_reducer::reduce_error(state, message, summary),

        Action::Extension { kind, .. } => {
            log::trace!("Ignoring action of unknown kind {:?}", kind);
        }
        Action::None => {}
    }
}
