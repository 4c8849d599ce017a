//! Log Reducer
//!
//! Product log lines, browser requests and fatal errors.

use crate::change_summary::{ChangeSummary, StateRegions};
use crate::state::{EngineState, LogLevel, LogLine, ManifestName};

pub fn reduce_log(state: &mut EngineState, line: &LogLine, summary: &mut ChangeSummary) {
    state.log_store.append(line.clone());
    summary.mark(StateRegions::LOGS);
}

pub fn reduce_open_browser(state: &mut EngineState, url: &str, summary: &mut ChangeSummary) {
    state.log_store.append(LogLine::new(
        ManifestName::default(),
        "browser",
        format!("Opening browser: {}", url),
    ));
    summary.mark(StateRegions::LOGS);
}

/// Record a fatal error; the first one wins
pub fn reduce_error(state: &mut EngineState, message: &str, summary: &mut ChangeSummary) {
    state.log_store.append(
        LogLine::new(ManifestName::default(), "fatal", message).with_level(LogLevel::Error),
    );
    if state.fatal_error.is_none() {
        state.fatal_error = Some(message.to_string());
    }
    summary.mark(StateRegions::FATAL | StateRegions::LOGS);
}
