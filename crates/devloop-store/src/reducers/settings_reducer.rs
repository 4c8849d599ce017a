//! Settings Reducer
//!
//! Analytics opt, metrics mode and terminal mode.

use crate::actions::MetricsModeAction;
use crate::change_summary::{ChangeSummary, StateRegions};
use crate::state::{AnalyticsOpt, EngineState, TerminalMode};

pub fn reduce_analytics_opt(state: &mut EngineState, opt: AnalyticsOpt, summary: &mut ChangeSummary) {
    if state.analytics_user_opt != opt {
        state.analytics_user_opt = opt;
        summary.mark(StateRegions::ANALYTICS);
    }
}

pub fn reduce_metrics_mode(
    state: &mut EngineState,
    mode: &MetricsModeAction,
    summary: &mut ChangeSummary,
) {
    state.metrics_serving = mode.serving.clone();
    state.metrics_settings = mode.settings.clone();
    summary.mark(StateRegions::METRICS);
}

pub fn reduce_terminal_mode(state: &mut EngineState, mode: TerminalMode, summary: &mut ChangeSummary) {
    if state.terminal_mode != mode {
        log::debug!("Switching terminal mode {} -> {}", state.terminal_mode, mode);
        state.terminal_mode = mode;
        summary.mark(StateRegions::TERMINAL);
    }
}
