//! Analytics facade
//!
//! Subscribers report usage through `Analytics`, which applies the user's
//! opt-out before anything reaches a sink.

use anyhow::{Context, Result};
use devloop_store::state::AnalyticsOpt;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

pub type Tags = BTreeMap<String, String>;

/// Where analytics events end up
pub trait AnalyticsSink: Send + Sync {
    fn count(&self, name: &str, tags: &Tags, n: u64);

    fn flush(&self) {}
}

/// Persists the user's analytics choice
pub trait Opter: Send + Sync {
    fn set_user_opt(&self, opt: AnalyticsOpt) -> Result<()>;
}

/// Sink writing events to the debug log
#[derive(Debug, Default)]
pub struct LogSink;

impl AnalyticsSink for LogSink {
    fn count(&self, name: &str, tags: &Tags, n: u64) {
        log::info!("analytics: {} +{} {:?}", name, n, tags);
    }
}

/// Stores the analytics choice in a file in the config directory
#[derive(Debug, Clone)]
pub struct FileOpter {
    path: PathBuf,
}

impl FileOpter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(devloop_config::paths::analytics_opt_path()?))
    }

    /// Previously stored choice, if any
    pub fn load(&self) -> Option<AnalyticsOpt> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        AnalyticsOpt::from_str(content.trim()).ok()
    }
}

impl Opter for FileOpter {
    fn set_user_opt(&self, opt: AnalyticsOpt) -> Result<()> {
        std::fs::write(&self.path, opt.to_string())
            .with_context(|| format!("Failed to write analytics choice to {}", self.path.display()))
    }
}

pub struct Analytics {
    sink: Arc<dyn AnalyticsSink>,
    opter: Arc<dyn Opter>,
    user_opt: Mutex<AnalyticsOpt>,
    global_tags: Tags,
}

impl Analytics {
    pub fn new(sink: Arc<dyn AnalyticsSink>, opter: Arc<dyn Opter>, user_opt: AnalyticsOpt) -> Self {
        Self {
            sink,
            opter,
            user_opt: Mutex::new(user_opt),
            global_tags: Tags::new(),
        }
    }

    /// Tags added to every event
    pub fn with_global_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.global_tags.insert(key.into(), value.into());
        self
    }

    pub fn user_opt(&self) -> AnalyticsOpt {
        *self.user_opt.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one occurrence of `name`; dropped when the user opted out
    pub fn incr(&self, name: &str, tags: Tags) {
        if self.user_opt() == AnalyticsOpt::OptOut {
            log::trace!("analytics: dropping {}, user opted out", name);
            return;
        }
        let mut all = self.global_tags.clone();
        all.extend(tags);
        self.sink.count(name, &all, 1);
    }

    /// Apply a new analytics choice; persisting it only when it changed
    ///
    /// The in-memory choice only moves once the opter stored it, so a failed
    /// save is attempted again on the next call.
    pub fn set_user_opt(&self, opt: AnalyticsOpt) -> Result<()> {
        let mut current = self.user_opt.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == opt {
            return Ok(());
        }
        self.opter.set_user_opt(opt)?;
        *current = opt;
        log::info!("Analytics choice changed to {}", opt);
        Ok(())
    }

    pub fn flush(&self) {
        self.sink.flush();
    }
}

/// Build tags from string pairs
pub fn tags<const N: usize>(pairs: [(&str, String); N]) -> Tags {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
