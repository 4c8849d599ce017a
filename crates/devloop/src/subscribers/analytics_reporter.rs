//! Periodic usage report
//!
//! Once the engine is up with a healthy config, reports a snapshot of the
//! session (resource counts, enabled features) shortly after start and then
//! every 15 minutes.

use crate::analytics::{Analytics, Tags};
use chrono::SecondsFormat;
use devloop_store::patterns::OneShot;
use devloop_store::state::{DisableState, EngineState};
use devloop_store::{ChangeSummary, StoreHandle, Subscriber};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Delay before the first report
pub const FIRST_REPORT_DELAY: Duration = Duration::from_secs(10);
pub const REPORT_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub struct AnalyticsReporter {
    analytics: Arc<Analytics>,
    started: OneShot,
}

impl AnalyticsReporter {
    pub fn new(analytics: Arc<Analytics>) -> Self {
        Self {
            analytics,
            started: OneShot::new(),
        }
    }
}

impl Subscriber for AnalyticsReporter {
    fn on_change(
        &mut self,
        ctx: &CancellationToken,
        store: &StoreHandle,
        _summary: &ChangeSummary,
    ) -> anyhow::Result<()> {
        if self.started.is_claimed() {
            return Ok(());
        }
        {
            let state = store.read_state();
            if state.start_time.is_none() || state.main_config_error.is_some() {
                return Ok(());
            }
        }
        if !self.started.claim() {
            return Ok(());
        }

        let ctx = ctx.clone();
        let store = store.clone();
        let analytics = self.analytics.clone();
        tokio::spawn(async move {
            let mut delay = FIRST_REPORT_DELAY;
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                let tags = report_tags(&store.read_state());
                analytics.incr("up.running", tags);
                delay = REPORT_INTERVAL;
            }
        });
        Ok(())
    }
}

/// Snapshot of the session for one `up.running` event
pub fn report_tags(state: &EngineState) -> Tags {
    let mut tags = Tags::new();
    let mut tag = |key: &str, value: String| {
        tags.insert(key.to_string(), value);
    };

    if let Some(start) = state.start_time {
        tag(
            "up.starttime",
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
    }
    tag(
        "builds.completed_count",
        state.completed_build_count.to_string(),
    );
    tag("env", state.env.clone());
    tag("term_mode", state.terminal_mode.code().to_string());

    let config_error = state.main_config_error.is_some();
    tag("config.error", config_error.to_string());

    if !config_error {
        let mut k8s = 0;
        let mut compose = 0;
        let mut local = 0;
        let mut unbuilt = 0;
        let mut live_update = 0;
        let mut enabled = 0;
        let mut label_keys = BTreeSet::new();

        for target in state.manifest_targets.values() {
            let manifest = &target.manifest;
            if manifest.is_k8s() {
                k8s += 1;
                if !manifest.has_image {
                    unbuilt += 1;
                }
            } else if manifest.is_docker_compose() {
                compose += 1;
            } else if manifest.is_local() {
                local += 1;
            }
            if manifest.has_live_update {
                live_update += 1;
            }
            if target.state.disable_state == DisableState::Enabled {
                enabled += 1;
            }
            label_keys.extend(manifest.labels.keys());
        }

        tag(
            "resource.count",
            state.manifest_definition_order.len().to_string(),
        );
        tag("resource.k8s.count", k8s.to_string());
        tag("resource.dockercompose.count", compose.to_string());
        tag("resource.local.count", local.to_string());
        tag("resource.unbuilt.count", unbuilt.to_string());
        tag("resource.liveupdate.count", live_update.to_string());
        tag("resource.enabled.count", enabled.to_string());
        tag("label.count", label_keys.len().to_string());
    }

    for (name, on) in &state.features {
        if *on {
            tag(&format!("feature.{}.enabled", name), "true".to_string());
        }
    }

    tags
}
