//! Subscribers
//!
//! The engine's side effects. Each one reacts to state changes from the
//! store and reports back by dispatching actions. Registered in `main` in
//! the order listed here.

mod analytics_reporter;
mod analytics_updater;
mod cloud_status;
mod disable_watcher;
mod metrics_mode;
mod pod_monitor;
mod terminal_prompt;

pub use analytics_reporter::AnalyticsReporter;
pub use analytics_updater::AnalyticsUpdater;
pub use cloud_status::CloudStatusManager;
pub use disable_watcher::DisableWatcher;
pub use metrics_mode::MetricsModeController;
pub use pod_monitor::PodMonitor;
pub use terminal_prompt::TerminalPrompt;
