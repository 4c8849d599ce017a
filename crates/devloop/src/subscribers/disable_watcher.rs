//! Stops docker compose services whose resource was disabled
//!
//! Disabling usually arrives in bursts (a whole label group at once), so
//! stops are debounced: the first change starts a short timer, and when it
//! fires every resource that is still disabled is removed in one
//! `docker compose rm` call.

use crate::compose::ServiceRemover;
use chrono::{DateTime, Utc};
use devloop_store::state::{DisableState, EngineState, LogLevel, LogLine, ManifestName};
use devloop_store::{Action, ChangeSummary, StateRegions, StoreHandle, Subscriber};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DISABLE_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
struct WatcherState {
    /// Container start time at the moment each service was last stopped
    last_stopped: HashMap<ManifestName, Option<DateTime<Utc>>>,
    in_flight: bool,
    spawned: usize,
}

pub struct DisableWatcher {
    remover: Arc<dyn ServiceRemover>,
    state: Arc<Mutex<WatcherState>>,
}

impl DisableWatcher {
    pub fn new(remover: Arc<dyn ServiceRemover>) -> Self {
        Self {
            remover,
            state: Arc::new(Mutex::new(WatcherState::default())),
        }
    }
}

fn lock(state: &Mutex<WatcherState>) -> MutexGuard<'_, WatcherState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Disabled compose services that are running and weren't already stopped
///
/// A service restarted since its last stop has a new start time and counts
/// again.
fn services_to_stop(
    engine: &EngineState,
    last_stopped: &HashMap<ManifestName, Option<DateTime<Utc>>>,
) -> Vec<(ManifestName, Option<DateTime<Utc>>)> {
    engine
        .targets()
        .into_iter()
        .filter(|t| t.manifest.is_docker_compose())
        .filter(|t| t.state.disable_state == DisableState::Disabled)
        .filter_map(|t| {
            let compose = t.state.compose.as_ref()?;
            if !compose.is_running() {
                return None;
            }
            if last_stopped.get(t.name()) == Some(&compose.start_time) {
                return None;
            }
            Some((t.name().clone(), compose.start_time))
        })
        .collect()
}

/// Drop stop records of manifests that no longer exist
fn forget_removed(state: &mut WatcherState, engine: &EngineState) {
    state
        .last_stopped
        .retain(|name, _| engine.manifest_targets.contains_key(name));
}

impl Subscriber for DisableWatcher {
    fn on_change(
        &mut self,
        ctx: &CancellationToken,
        store: &StoreHandle,
        summary: &ChangeSummary,
    ) -> anyhow::Result<()> {
        if !summary.touches(StateRegions::RUNTIME) {
            return Ok(());
        }

        {
            let mut state = lock(&self.state);
            let engine = store.read_state();
            forget_removed(&mut state, &engine);
            if state.in_flight {
                return Ok(());
            }
            let pending = services_to_stop(&engine, &state.last_stopped);
            if pending.is_empty() {
                return Ok(());
            }
            state.in_flight = true;
            state.spawned += 1;
        }

        let ctx = ctx.clone();
        let store = store.clone();
        let remover = self.remover.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = ctx.cancelled() => {
                    lock(&state).in_flight = false;
                    return;
                }
                _ = tokio::time::sleep(DISABLE_DEBOUNCE) => {}
            }

            // re-read: some resources may have been re-enabled meanwhile
            let services: Vec<String> = {
                let mut state = lock(&state);
                state.in_flight = false;
                let engine = store.read_state();
                forget_removed(&mut state, &engine);
                let to_stop = services_to_stop(&engine, &state.last_stopped);
                to_stop
                    .into_iter()
                    .map(|(name, start_time)| {
                        let service = name.to_string();
                        state.last_stopped.insert(name, start_time);
                        service
                    })
                    .collect()
            };
            if services.is_empty() {
                return;
            }

            log::info!("Stopping disabled services: {}", services.join(", "));
            if let Err(e) = remover.rm(&services).await {
                log::warn!("Failed to stop disabled services: {:#}", e);
                store.dispatch(Action::Log(
                    LogLine::new(
                        ManifestName::default(),
                        "disable",
                        format!("Error stopping disabled services: {:#}", e),
                    )
                    .with_level(LogLevel::Warn),
                ));
            }
        });
        Ok(())
    }
}
