//! Change summaries
//!
//! A `ChangeSummary` describes which parts of the state one batch of actions
//! touched. Subscribers use it to skip work when nothing they care about
//! changed. Summaries may over-report, never under-report.

use crate::state::ManifestName;
use bitflags::bitflags;
use std::collections::BTreeSet;
use std::time::Duration;

bitflags! {
    /// Regions of `EngineState` a batch may have touched
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct StateRegions: u16 {
        /// Build counts and results
        const BUILDS = 1 << 0;
        /// Manifest definitions and their runtime (pods, containers, disable state)
        const RUNTIME = 1 << 1;
        /// Main config file load result
        const CONFIG = 1 << 2;
        const FEATURES = 1 << 3;
        const ANALYTICS = 1 << 4;
        /// Cloud address, token and status
        const CLOUD = 1 << 5;
        const METRICS = 1 << 6;
        const TERMINAL = 1 << 7;
        const LOGS = 1 << 8;
        const FATAL = 1 << 9;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// "Something changed, I can't say what." Every `touches` query answers yes.
    pub legacy: bool,
    pub regions: StateRegions,
    /// Manifests whose target changed
    pub manifests: BTreeSet<ManifestName>,
    /// Backoff applied before this delivery; zero unless it is a retry
    pub last_backoff: Duration,
}

impl ChangeSummary {
    /// Summary that claims everything changed
    pub fn legacy() -> Self {
        Self {
            legacy: true,
            ..Default::default()
        }
    }

    pub fn touched(regions: StateRegions) -> Self {
        Self {
            regions,
            ..Default::default()
        }
    }

    pub fn mark(&mut self, regions: StateRegions) {
        self.regions |= regions;
    }

    pub fn mark_manifest(&mut self, regions: StateRegions, name: &ManifestName) {
        self.regions |= regions;
        self.manifests.insert(name.clone());
    }

    /// Merge `other` into this summary
    pub fn add(&mut self, other: &ChangeSummary) {
        self.legacy |= other.legacy;
        self.regions |= other.regions;
        self.manifests.extend(other.manifests.iter().cloned());
        self.last_backoff = self.last_backoff.max(other.last_backoff);
    }

    pub fn is_empty(&self) -> bool {
        !self.legacy && self.regions.is_empty() && self.manifests.is_empty()
    }

    /// True if any of `regions` may have changed
    pub fn touches(&self, regions: StateRegions) -> bool {
        self.legacy || self.regions.intersects(regions)
    }

    pub fn touches_manifest(&self, name: &ManifestName) -> bool {
        self.legacy || self.manifests.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_everything() {
        let mut a = ChangeSummary::touched(StateRegions::BUILDS);
        a.last_backoff = Duration::from_secs(2);

        let mut b = ChangeSummary::default();
        b.mark_manifest(StateRegions::RUNTIME, &ManifestName::from("fe"));
        b.last_backoff = Duration::from_secs(1);

        a.add(&b);

        assert!(a.touches(StateRegions::BUILDS));
        assert!(a.touches(StateRegions::RUNTIME));
        assert!(!a.touches(StateRegions::CLOUD));
        assert!(a.touches_manifest(&ManifestName::from("fe")));
        assert_eq!(a.last_backoff, Duration::from_secs(2));
    }

    #[test]
    fn test_legacy_touches_everything() {
        let summary = ChangeSummary::legacy();
        assert!(!summary.is_empty());
        assert!(summary.touches(StateRegions::METRICS));
        assert!(summary.touches_manifest(&ManifestName::from("anything")));
        assert!(ChangeSummary::default().is_empty());
    }
}
