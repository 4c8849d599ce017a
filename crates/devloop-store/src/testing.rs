//! Test harness for subscribers
//!
//! `TestingStore` stands in for the real store: tests set its state directly,
//! notify a subscriber by hand and then wait for the actions it dispatches.
//! Nothing is ever reduced.
//!
//! ```ignore
//! let st = TestingStore::new();
//! st.with_state(|s| s.cloud_address = "cloud.test".into());
//! subscriber.on_change(&ctx, &st.handle(), &ChangeSummary::legacy())?;
//! let action = st.wait_for_action(ActionKind::CloudStatusReceived, TIMEOUT).await?;
//! ```

use crate::actions::{Action, ActionKind};
use crate::state::EngineState;
use crate::store::{RStore, StateReadGuard, StoreHandle};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

#[derive(Debug, Error)]
pub enum TestingStoreError {
    #[error("timed out after {timeout:?} waiting for {kind:?} action")]
    Timeout { kind: ActionKind, timeout: Duration },

    #[error("unexpected {kind:?} action: {action}")]
    Unexpected { kind: ActionKind, action: String },
}

#[derive(Default)]
struct RecordedActions {
    all: Vec<Action>,
    /// Actions before this index were consumed by a wait
    cursor: usize,
}

#[derive(Default)]
pub struct TestingStore {
    state: RwLock<EngineState>,
    actions: Mutex<RecordedActions>,
    dispatched: Notify,
}

impl TestingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn handle(self: &Arc<Self>) -> StoreHandle {
        self.clone()
    }

    pub fn set_state(&self, state: EngineState) {
        *self.lock_mutable_state() = state;
    }

    pub fn with_state(&self, f: impl FnOnce(&mut EngineState)) {
        f(&mut *self.lock_mutable_state());
    }

    pub fn lock_mutable_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn recorded(&self) -> MutexGuard<'_, RecordedActions> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every action dispatched so far, consumed or not
    pub fn actions(&self) -> Vec<Action> {
        self.recorded().all.clone()
    }

    pub fn actions_of_kind(&self, kind: ActionKind) -> Vec<Action> {
        self.recorded()
            .all
            .iter()
            .filter(|a| a.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn clear_actions(&self) {
        let mut recorded = self.recorded();
        recorded.all.clear();
        recorded.cursor = 0;
    }

    /// Consume up to and including the next unconsumed action of `kind`
    fn take_next(&self, kind: ActionKind) -> Option<Action> {
        let mut recorded = self.recorded();
        let offset = recorded.all[recorded.cursor..]
            .iter()
            .position(|a| a.kind() == kind)?;
        let index = recorded.cursor + offset;
        recorded.cursor = index + 1;
        Some(recorded.all[index].clone())
    }

    /// Wait for the next action of `kind`
    pub async fn wait_for_action(
        &self,
        kind: ActionKind,
        timeout: Duration,
    ) -> Result<Action, TestingStoreError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.dispatched.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(action) = self.take_next(kind) {
                return Ok(action);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(TestingStoreError::Timeout { kind, timeout });
            }
        }
    }

    /// Fail if an action of `kind` shows up within `within`
    pub async fn assert_no_action(
        &self,
        kind: ActionKind,
        within: Duration,
    ) -> Result<(), TestingStoreError> {
        match self.wait_for_action(kind, within).await {
            Ok(action) => Err(TestingStoreError::Unexpected {
                kind,
                action: format!("{:?}", action),
            }),
            Err(TestingStoreError::Timeout { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl RStore for TestingStore {
    fn read_state(&self) -> StateReadGuard<'_> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, action: Action) {
        self.recorded().all.push(action);
        self.dispatched.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TerminalMode;

    #[tokio::test(start_paused = true)]
    async fn test_wait_finds_earlier_dispatch() {
        let st = TestingStore::new();
        st.handle().dispatch(Action::SwitchTerminalMode(TerminalMode::Hud));

        let action = st
            .wait_for_action(ActionKind::SwitchTerminalMode, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(matches!(action, Action::SwitchTerminalMode(TerminalMode::Hud)));

        // consumed
        st.assert_no_action(ActionKind::SwitchTerminalMode, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(st.actions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_later_dispatch() {
        let st = TestingStore::new();
        let handle = st.handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.dispatch(Action::None);
            handle.dispatch(Action::error("late"));
        });

        let action = st
            .wait_for_action(ActionKind::Error, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(matches!(action, Action::Error(ref m) if m == "late"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_and_unexpected() {
        let st = TestingStore::new();
        let err = st
            .wait_for_action(ActionKind::Error, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, TestingStoreError::Timeout { .. }));

        st.handle().dispatch(Action::error("x"));
        let err = st
            .assert_no_action(ActionKind::Error, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, TestingStoreError::Unexpected { .. }));
    }

    #[test]
    fn test_state_accessors() {
        let st = TestingStore::new();
        st.with_state(|s| s.web_url = "http://localhost:10350/".to_string());
        assert_eq!(st.read_state().web_url, "http://localhost:10350/");

        st.set_state(EngineState::default());
        assert_eq!(st.read_state().web_url, "");
    }
}
