//! Metrics exporters
//!
//! Code that records metrics holds a `SwappableExporter`; the metrics mode
//! controller decides what sits behind it.

use devloop_store::state::MetricsSettings;
use std::sync::{Arc, PoisonError, RwLock};

pub trait MetricsExporter: Send + Sync {
    /// Short name for logs
    fn kind(&self) -> &'static str;

    fn export(&self, name: &str, value: f64);
}

/// Drops everything
#[derive(Debug, Default)]
pub struct NoopExporter;

impl MetricsExporter for NoopExporter {
    fn kind(&self) -> &'static str {
        "noop"
    }

    fn export(&self, _name: &str, _value: f64) {}
}

/// Sends metrics to the local collector
#[derive(Debug)]
pub struct CollectorExporter {
    settings: MetricsSettings,
}

impl CollectorExporter {
    pub fn new(settings: MetricsSettings) -> Self {
        Self { settings }
    }
}

impl MetricsExporter for CollectorExporter {
    fn kind(&self) -> &'static str {
        "collector"
    }

    fn export(&self, name: &str, value: f64) {
        log::debug!(
            "metrics: {}={} -> {} (insecure: {})",
            name,
            value,
            self.settings.address,
            self.settings.insecure
        );
    }
}

/// Exporter whose implementation can be replaced at runtime
pub struct SwappableExporter {
    current: RwLock<Arc<dyn MetricsExporter>>,
}

impl Default for SwappableExporter {
    fn default() -> Self {
        Self::new(Arc::new(NoopExporter))
    }
}

impl SwappableExporter {
    pub fn new(initial: Arc<dyn MetricsExporter>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    pub fn swap(&self, next: Arc<dyn MetricsExporter>) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        log::info!("Metrics exporter: {} -> {}", current.kind(), next.kind());
        *current = next;
    }

    pub fn current(&self) -> Arc<dyn MetricsExporter> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MetricsExporter for SwappableExporter {
    fn kind(&self) -> &'static str {
        "swappable"
    }

    fn export(&self, name: &str, value: f64) {
        self.current().export(name, value);
    }
}
