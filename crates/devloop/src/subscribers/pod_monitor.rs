//! Pod rollout progress
//!
//! Prints a short progress report for each pod as it moves through
//! scheduling, initialization and readiness. Lines go into the log store of
//! the pod's manifest, and only when something about the pod changed.

use chrono::{DateTime, Utc};
use devloop_store::patterns::DiffTracker;
use devloop_store::state::{
    LogLine, ManifestName, Pod, PodCondition, CONDITION_TRUE, POD_INITIALIZED, POD_READY,
    POD_SCHEDULED,
};
use devloop_store::{Action, ChangeSummary, StateRegions, StoreHandle, Subscriber};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

const INDENT: &str = "     ";
const NAME_WIDTH: usize = 16;
const NOT_PREFIX: &str = "Not ";

/// Pods are tracked per manifest
type PodKey = (String, ManifestName);

/// The parts of a pod the report is built from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PodSnapshot {
    pod_id: String,
    manifest: ManifestName,
    created_at: Option<DateTime<Utc>>,
    scheduled: PodCondition,
    initialized: PodCondition,
    ready: PodCondition,
}

impl PodSnapshot {
    fn new(pod: &Pod, manifest: &ManifestName) -> Self {
        let mut snapshot = Self {
            pod_id: pod.name.clone(),
            manifest: manifest.clone(),
            created_at: pod.created_at,
            ..Default::default()
        };
        for condition in &pod.conditions {
            match condition.kind.as_str() {
                POD_SCHEDULED => snapshot.scheduled = condition.clone(),
                POD_INITIALIZED => snapshot.initialized = condition.clone(),
                POD_READY => snapshot.ready = condition.clone(),
                _ => {}
            }
        }
        snapshot
    }

    fn span_id(&self) -> String {
        format!("monitor:{}:{}", self.manifest, self.pod_id)
    }
}

#[derive(Default)]
pub struct PodMonitor {
    pods: DiffTracker<PodKey, PodSnapshot>,
    /// Pruned with `pods`, so a pod that comes back gets a new header
    tracking_started: HashSet<PodKey>,
}

impl PodMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lines_for(&mut self, update: &PodSnapshot) -> Vec<LogLine> {
        let span_id = update.span_id();
        let mut lines = Vec::new();

        let key = (update.pod_id.clone(), update.manifest.clone());
        if self.tracking_started.insert(key) {
            lines.push(LogLine::new(
                update.manifest.clone(),
                span_id.clone(),
                format!("\nTracking new pod rollout ({}):", update.pod_id),
            ));
        }

        let conditions = [
            ("Scheduled", &update.scheduled, update.created_at),
            (
                "Initialized",
                &update.initialized,
                update.scheduled.last_transition_time,
            ),
            (
                "Ready",
                &update.ready,
                update.initialized.last_transition_time,
            ),
        ];
        for (name, condition, start) in conditions {
            lines.push(
                LogLine::new(
                    update.manifest.clone(),
                    span_id.clone(),
                    condition_line(name, condition, start),
                )
                .with_progress_id(name),
            );
        }
        lines
    }
}

impl Subscriber for PodMonitor {
    fn on_change(
        &mut self,
        _ctx: &CancellationToken,
        store: &StoreHandle,
        summary: &ChangeSummary,
    ) -> anyhow::Result<()> {
        if !summary.touches(StateRegions::RUNTIME) {
            return Ok(());
        }

        let updates = {
            let state = store.read_state();
            let current: Vec<(PodKey, PodSnapshot)> = state
                .targets()
                .into_iter()
                .filter_map(|target| {
                    let pod = target.state.most_recent_pod.as_ref()?;
                    if pod.name.is_empty() {
                        return None;
                    }
                    let snapshot = PodSnapshot::new(pod, target.name());
                    Some(((pod.name.clone(), target.name().clone()), snapshot))
                })
                .collect();
            self.pods.observe(current)
        };
        let pods = &self.pods;
        self.tracking_started.retain(|key| pods.contains(key));

        for (_, update) in updates {
            for line in self.lines_for(&update) {
                store.dispatch(Action::Log(line));
            }
        }
        Ok(())
    }
}

/// One line of the rollout report
fn condition_line(name: &str, condition: &PodCondition, start: Option<DateTime<Utc>>) -> String {
    let spacer = " ".repeat(NAME_WIDTH.saturating_sub(name.len()));

    let duration = match (start, condition.last_transition_time) {
        (Some(start), Some(end)) => {
            let elapsed = end - start;
            if elapsed.is_zero() {
                "<1s".to_string()
            } else {
                format_duration(elapsed)
            }
        }
        _ => String::new(),
    };

    if condition.status == CONDITION_TRUE {
        return format!("{INDENT}┊ {name}{spacer}- {duration}");
    }

    // a finished job's pod never reports Ready, so call it done
    if condition.kind == POD_READY && condition.reason == "PodCompleted" {
        let name = "Completed";
        let spacer = " ".repeat(NAME_WIDTH - name.len());
        return format!("{INDENT}┊ {name}{spacer}- {duration}");
    }

    if condition.status.is_empty() || condition.reason.is_empty() || condition.message.is_empty()
    {
        return format!("{INDENT}┊ {name}{spacer}- (…) Pending");
    }

    let spacer = " ".repeat(NAME_WIDTH.saturating_sub(name.len() + NOT_PREFIX.len()));
    format!(
        "{INDENT}┃ {NOT_PREFIX}{name}{spacer}- ({}): {}",
        condition.reason, condition.message
    )
}

/// Compact duration at millisecond precision, e.g. "500ms", "1.5s", "2m3s"
fn format_duration(d: chrono::Duration) -> String {
    let ms = d.num_milliseconds();
    if ms == 0 {
        return "0s".to_string();
    }
    let sign = if ms < 0 { "-" } else { "" };
    let ms = ms.unsigned_abs();
    if ms < 1000 {
        return format!("{sign}{ms}ms");
    }

    let hours = ms / 3_600_000;
    let minutes = ms % 3_600_000 / 60_000;
    let seconds = ms % 60_000 / 1000;
    let millis = ms % 1000;

    let mut out = sign.to_string();
    if hours > 0 {
        out.push_str(&format!("{hours}h{minutes}m"));
    } else if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&seconds.to_string());
    if millis > 0 {
        out.push_str(format!(".{millis:03}").trim_end_matches('0'));
    }
    out.push('s');
    out
}
