//! Keeps the analytics facade in line with the user's choice

use crate::analytics::{Analytics, Tags};
use devloop_store::patterns::OneShot;
use devloop_store::{ChangeSummary, StoreHandle, Subscriber};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AnalyticsUpdater {
    analytics: Arc<Analytics>,
    /// Tags describing how devloop was invoked, sent with `cmd.up`
    cmd_tags: Tags,
    reported_up: OneShot,
}

impl AnalyticsUpdater {
    pub fn new(analytics: Arc<Analytics>, cmd_tags: Tags) -> Self {
        Self {
            analytics,
            cmd_tags,
            reported_up: OneShot::new(),
        }
    }
}

impl Subscriber for AnalyticsUpdater {
    fn on_change(
        &mut self,
        _ctx: &CancellationToken,
        store: &StoreHandle,
        _summary: &ChangeSummary,
    ) -> anyhow::Result<()> {
        let (opt, started) = {
            let state = store.read_state();
            (state.analytics_user_opt, state.start_time.is_some())
        };

        // applied first so an opted-out user's cmd.up is dropped
        self.analytics.set_user_opt(opt)?;

        if started && self.reported_up.claim() {
            self.analytics.incr("cmd.up", self.cmd_tags.clone());
        }
        Ok(())
    }
}
