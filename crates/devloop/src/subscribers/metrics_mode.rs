//! Metrics mode
//!
//! Decides once at startup whether metrics go to a local collector. The
//! `DEVLOOP_METRICS` environment variable wins over the user's saved
//! preference; anything else means the default (no local stack).
//!
//! Engine gauges are exported every reporting period through the shared
//! exporter, so switching modes redirects them without restarting anything.

use crate::metrics::{CollectorExporter, MetricsExporter, NoopExporter, SwappableExporter};
use anyhow::Context;
use devloop_config::PrefsStore;
use devloop_store::actions::MetricsModeAction;
use devloop_store::patterns::OneShot;
use devloop_store::state::{MetricsMode, MetricsServing, MetricsSettings};
use devloop_store::{Action, ChangeSummary, StoreHandle, Subscriber};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const METRICS_ENV_VAR: &str = "DEVLOOP_METRICS";

const COLLECTOR_PORT: u16 = 10351;
const GRAFANA_PORT: u16 = 10352;
const REPORTING_PERIOD: Duration = Duration::from_secs(5);

/// Cheap to clone; clones share the exporter and the start-up guard
#[derive(Clone)]
pub struct MetricsModeController {
    web_host: String,
    prefs: Arc<dyn PrefsStore>,
    exporter: Arc<SwappableExporter>,
    env_mode: Option<MetricsMode>,
    initialized: Arc<OneShot>,
}

impl MetricsModeController {
    pub fn new(
        web_host: impl Into<String>,
        prefs: Arc<dyn PrefsStore>,
        exporter: Arc<SwappableExporter>,
        env_mode: Option<MetricsMode>,
    ) -> Self {
        Self {
            web_host: web_host.into(),
            prefs,
            exporter,
            env_mode,
            initialized: Arc::new(OneShot::new()),
        }
    }

    /// Mode requested through the environment, if any
    pub fn env_mode() -> Option<MetricsMode> {
        let value = std::env::var(METRICS_ENV_VAR).ok()?;
        MetricsMode::from_str(value.trim()).ok()
    }

    fn desired_mode(&self) -> MetricsMode {
        if let Some(mode @ (MetricsMode::Local | MetricsMode::Disabled)) = self.env_mode {
            return mode;
        }

        let prefs = match self.prefs.load() {
            Ok(prefs) => prefs,
            Err(e) => {
                log::debug!("Reading user preferences: {:#}", e);
                return MetricsMode::Default;
            }
        };
        match prefs.metrics_mode {
            mode @ (MetricsMode::Local | MetricsMode::Disabled) => mode,
            MetricsMode::Default => MetricsMode::Default,
        }
    }

    /// Switch modes on the user's request and remember the choice
    pub fn set_user_mode(&self, store: &StoreHandle, mode: MetricsMode) -> anyhow::Result<()> {
        if store.read_state().metrics_serving.mode == mode {
            return Ok(());
        }

        let mut prefs = self.prefs.load().context("Failed to read user preferences")?;
        prefs.metrics_mode = mode;
        self.prefs
            .save(&prefs)
            .context("Failed to write metrics mode")?;

        if mode == MetricsMode::Local {
            self.set_local(store);
        } else {
            self.set_default(store);
        }
        Ok(())
    }

    fn set_local(&self, store: &StoreHandle) {
        let settings = MetricsSettings {
            enabled: true,
            address: format!("{}:{}", self.web_host, COLLECTOR_PORT),
            insecure: true,
            reporting_period: REPORTING_PERIOD,
            allow_anonymous: true,
        };
        self.exporter
            .swap(Arc::new(CollectorExporter::new(settings.clone())));
        store.dispatch(Action::MetricsMode(MetricsModeAction {
            serving: MetricsServing {
                mode: MetricsMode::Local,
                grafana_host: format!("{}:{}", self.web_host, GRAFANA_PORT),
            },
            settings,
        }));
    }

    /// Flip between the local stack and the default
    pub fn toggle_local(&self, store: &StoreHandle) -> anyhow::Result<MetricsMode> {
        let next = match store.read_state().metrics_serving.mode {
            MetricsMode::Local => MetricsMode::Default,
            _ => MetricsMode::Local,
        };
        self.set_user_mode(store, next)?;
        Ok(next)
    }

    fn set_default(&self, store: &StoreHandle) {
        self.exporter.swap(Arc::new(NoopExporter));
        store.dispatch(Action::MetricsMode(MetricsModeAction {
            serving: MetricsServing {
                mode: MetricsMode::Default,
                grafana_host: String::new(),
            },
            settings: MetricsSettings::default(),
        }));
    }
}

impl Subscriber for MetricsModeController {
    fn on_change(
        &mut self,
        ctx: &CancellationToken,
        store: &StoreHandle,
        _summary: &ChangeSummary,
    ) -> anyhow::Result<()> {
        if !self.initialized.claim() {
            return Ok(());
        }
        if self.desired_mode() == MetricsMode::Local {
            self.set_local(store);
        }
        spawn_reporting(ctx.clone(), store.clone(), self.exporter.clone());
        Ok(())
    }
}

/// Export engine gauges every reporting period until cancelled
fn spawn_reporting(ctx: CancellationToken, store: StoreHandle, exporter: Arc<SwappableExporter>) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = ctx.cancelled() => return,
                _ = tokio::time::sleep(REPORTING_PERIOD) => {}
            }
            let (builds, resources) = {
                let state = store.read_state();
                (
                    state.completed_build_count,
                    state.manifest_definition_order.len(),
                )
            };
            exporter.export("builds.completed", builds as f64);
            exporter.export("resources", resources as f64);
        }
    });
}
