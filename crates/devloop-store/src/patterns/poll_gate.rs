use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Why a request is being made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Routine refresh; skipped while cooling down after an error
    Periodic,
    /// Someone is waiting on the answer; ignores the cooldown
    Blocking,
}

#[derive(Debug, Default)]
struct GateState {
    in_flight: bool,
    cooldown_until: Option<Instant>,
    last_success: Option<Instant>,
}

/// Debounced polling with error backoff
///
/// Hands out at most one `PollPermit` at a time. Failing a permit starts a
/// cooldown during which periodic requests are refused.
#[derive(Debug)]
pub struct PollGate {
    cooldown: Duration,
    state: Mutex<GateState>,
}

impl PollGate {
    pub fn new(cooldown: Duration) -> Arc<Self> {
        Arc::new(Self {
            cooldown,
            state: Mutex::new(GateState::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a request, unless one is in flight or the gate is cooling down
    pub fn try_begin(self: &Arc<Self>, mode: PollMode) -> Option<PollPermit> {
        let mut state = self.lock();
        if state.in_flight {
            return None;
        }
        if mode == PollMode::Periodic && matches!(state.cooldown_until, Some(t) if t > Instant::now())
        {
            return None;
        }
        state.in_flight = true;
        Some(PollPermit {
            gate: self.clone(),
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    pub fn is_cooling_down(&self) -> bool {
        matches!(self.lock().cooldown_until, Some(t) if t > Instant::now())
    }

    /// Time since the last successful request
    pub fn since_last_success(&self) -> Option<Duration> {
        self.lock().last_success.map(|t| t.elapsed())
    }
}

/// Proof that the holder is the only request in flight
///
/// Dropping it ends the request; `succeed` and `fail` also record the
/// outcome.
#[derive(Debug)]
pub struct PollPermit {
    gate: Arc<PollGate>,
}

impl PollPermit {
    pub fn succeed(self) {
        let mut state = self.gate.lock();
        state.last_success = Some(Instant::now());
        state.cooldown_until = None;
    }

    pub fn fail(self) {
        let mut state = self.gate.lock();
        state.cooldown_until = Some(Instant::now() + self.gate.cooldown);
    }
}

impl Drop for PollPermit {
    fn drop(&mut self) {
        self.gate.lock().in_flight = false;
    }
}
