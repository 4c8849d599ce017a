use crate::actions::Action;
use crate::change_summary::ChangeSummary;
use crate::dispatcher::Dispatcher;
use crate::reducers;
use crate::state::EngineState;
use crate::subscriber::{panic_message, Subscriber, SubscriberList};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reducer signature: mutate the state for one action, record what changed
pub type Reducer = fn(&mut EngineState, &Action, &mut ChangeSummary);

/// Shared read guard over the engine state
///
/// Hold it briefly: the reduction worker can't apply actions while any
/// guard is alive.
pub type StateReadGuard<'a> = RwLockReadGuard<'a, EngineState>;

/// What subscribers and producers see of a store
///
/// Implemented by the real store and by `TestingStore`.
pub trait RStore: Send + Sync {
    fn read_state(&self) -> StateReadGuard<'_>;
    fn dispatch(&self, action: Action);
}

pub type StoreHandle = Arc<dyn RStore>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("set up of subscriber {subscriber} failed: {message}")]
    SetUp { subscriber: String, message: String },

    #[error("fatal error: {0}")]
    Fatal(String),
}

struct SharedStore {
    state: RwLock<EngineState>,
    dispatcher: Dispatcher,
}

impl RStore for SharedStore {
    fn read_state(&self) -> StateReadGuard<'_> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, action: Action) {
        self.dispatcher.dispatch(action);
    }
}

/// The engine store
///
/// Owns the state, the action queue and the subscribers. Actions may be
/// dispatched from anywhere through a handle or dispatcher; only `run`
/// applies them, one at a time, under the write lock.
///
/// ```ignore
/// let mut store = Store::new();
/// store.add_subscriber(AnalyticsReporter::new(analytics));
/// let handle = store.handle();
/// tokio::spawn(store.run(ctx.clone()));
/// handle.dispatch(Action::Init(init));
/// ```
pub struct Store {
    shared: Arc<SharedStore>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    subscribers: SubscriberList,
    reducer: Reducer,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_reducer(EngineState::default(), reducers::reduce)
    }

    pub fn with_state(state: EngineState) -> Self {
        Self::with_reducer(state, reducers::reduce)
    }

    pub fn with_reducer(state: EngineState, reducer: Reducer) -> Self {
        let (tx, action_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(SharedStore {
                state: RwLock::new(state),
                dispatcher: Dispatcher::new(tx),
            }),
            action_rx,
            subscribers: SubscriberList::new(),
            reducer,
        }
    }

    /// Add a subscriber
    ///
    /// Subscribers are set up and notified in the order they were added.
    /// Add them before calling `run`.
    pub fn add_subscriber<S: Subscriber + 'static>(&mut self, subscriber: S) {
        self.subscribers.add(subscriber);
    }

    pub fn add_boxed_subscriber(&mut self, subscriber: Box<dyn Subscriber>) {
        self.subscribers.add_boxed(subscriber);
    }

    pub fn handle(&self) -> StoreHandle {
        self.shared.clone()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.shared.dispatcher.clone()
    }

    pub fn read_state(&self) -> StateReadGuard<'_> {
        self.shared.read_state()
    }

    fn lock_mutable_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.shared.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the reduction loop until `ctx` is cancelled or a fatal error is
    /// dispatched
    ///
    /// Sets up all subscribers first; a set-up error aborts before any
    /// action is reduced. Subscribers are torn down on every exit path.
    pub async fn run(mut self, ctx: CancellationToken) -> Result<(), StoreError> {
        let handle = self.handle();

        if let Err(err) = self.subscribers.set_up(&ctx, &handle) {
            log::error!("Store failed to start: {}", err);
            self.subscribers.tear_down();
            return Err(err);
        }
        log::info!("Store started with {} subscribers", self.subscribers.len());

        let result = self.process_actions(&ctx, &handle).await;

        self.subscribers.tear_down();
        match &result {
            Ok(()) => log::info!("Store stopped"),
            Err(err) => log::error!("Store stopped: {}", err),
        }
        result
    }

    async fn process_actions(
        &mut self,
        ctx: &CancellationToken,
        handle: &StoreHandle,
    ) -> Result<(), StoreError> {
        loop {
            let next_retry = self.subscribers.next_retry();
            let first = tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                action = self.action_rx.recv() => match action {
                    Some(action) => Some(action),
                    None => return Ok(()),
                },
                _ = sleep_until(next_retry) => None,
            };

            if let Some(first) = first {
                let mut batch = vec![first];
                while let Ok(action) = self.action_rx.try_recv() {
                    batch.push(action);
                }

                let summary = self.reduce_batch(&batch);
                if !summary.is_empty() {
                    self.subscribers.notify_all(ctx, handle, &summary);
                }

                if let Some(message) = batch.iter().find_map(|a| match a {
                    Action::Error(message) => Some(message.clone()),
                    _ => None,
                }) {
                    return Err(StoreError::Fatal(message));
                }
            }

            self.subscribers.notify_due(ctx, handle);
        }
    }

    /// Apply a batch of actions in order, taking the write lock per action
    fn reduce_batch(&self, batch: &[Action]) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        for action in batch {
            let mut state = self.lock_mutable_state();
            let result = catch_unwind(AssertUnwindSafe(|| {
                (self.reducer)(&mut *state, action, &mut summary)
            }));
            if let Err(panic) = result {
                log::error!(
                    "Reducer panicked on {} action: {}",
                    action.kind().name(),
                    panic_message(&*panic)
                );
                summary.legacy = true;
            }
        }
        log::trace!("Reduced {} actions", batch.len());
        summary
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::BuildCompletedAction;
    use crate::change_summary::StateRegions;
    use crate::state::{ManifestName, TerminalMode};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every summary it receives, optionally failing the first few
    struct Recorder {
        name: &'static str,
        events: Arc<Mutex<Vec<String>>>,
        summaries: Arc<Mutex<Vec<ChangeSummary>>>,
        failures_left: usize,
        fail_set_up: bool,
    }

    impl Recorder {
        fn new(name: &'static str, events: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                events: events.clone(),
                summaries: Arc::new(Mutex::new(Vec::new())),
                failures_left: 0,
                fail_set_up: false,
            }
        }

        fn log(&self, event: &str) {
            self.events.lock().unwrap().push(format!("{}:{}", event, self.name));
        }
    }

    impl Subscriber for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn set_up(&mut self, _ctx: &CancellationToken, _store: &StoreHandle) -> anyhow::Result<()> {
            self.log("setup");
            if self.fail_set_up {
                anyhow::bail!("no terminal");
            }
            Ok(())
        }

        fn on_change(
            &mut self,
            _ctx: &CancellationToken,
            _store: &StoreHandle,
            summary: &ChangeSummary,
        ) -> anyhow::Result<()> {
            self.log("change");
            self.summaries.lock().unwrap().push(summary.clone());
            if self.failures_left > 0 {
                self.failures_left -= 1;
                anyhow::bail!("flaky");
            }
            Ok(())
        }

        fn tear_down(&mut self) {
            self.log("teardown");
        }
    }

    struct Panicker;

    impl Subscriber for Panicker {
        fn on_change(
            &mut self,
            _ctx: &CancellationToken,
            _store: &StoreHandle,
            _summary: &ChangeSummary,
        ) -> anyhow::Result<()> {
            panic!("subscriber bug");
        }
    }

    fn build_completed(name: &str) -> Action {
        Action::BuildCompleted(BuildCompletedAction {
            manifest: ManifestName::from(name),
            error: None,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_fifo_teardown_lifo() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut store = Store::new();
        store.add_subscriber(Recorder::new("a", &events));
        store.add_subscriber(Recorder::new("b", &events));

        let ctx = CancellationToken::new();
        let task = tokio::spawn(store.run(ctx.clone()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        ctx.cancel();
        let result = task.await.unwrap();

        assert!(result.is_ok());
        assert_eq!(
            *events.lock().unwrap(),
            vec!["setup:a", "setup:b", "teardown:b", "teardown:a"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_error_aborts_startup() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut failing = Recorder::new("b", &events);
        failing.fail_set_up = true;

        let mut store = Store::new();
        store.add_subscriber(Recorder::new("a", &events));
        store.add_subscriber(failing);
        store.add_subscriber(Recorder::new("c", &events));
        let handle = store.handle();

        handle.dispatch(build_completed("api"));
        let result = store.run(CancellationToken::new()).await;

        assert!(matches!(result, Err(StoreError::SetUp { ref subscriber, .. }) if subscriber == "b"));
        assert_eq!(
            *events.lock().unwrap(),
            vec!["setup:a", "setup:b", "teardown:a"]
        );
        assert_eq!(handle.read_state().completed_build_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actions_reduced_in_order_and_summarized() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorder = Recorder::new("a", &events);
        let summaries = recorder.summaries.clone();

        let mut store = Store::new();
        store.add_subscriber(recorder);
        let handle = store.handle();
        let dispatcher = store.dispatcher();

        dispatcher.dispatch(Action::SwitchTerminalMode(TerminalMode::Stream));
        dispatcher.dispatch(Action::SwitchTerminalMode(TerminalMode::Hud));
        dispatcher.dispatch(build_completed("api"));

        let ctx = CancellationToken::new();
        let task = tokio::spawn(store.run(ctx.clone()));
        tokio::time::sleep(Duration::from_millis(10)).await;

        {
            let state = handle.read_state();
            assert_eq!(state.terminal_mode, TerminalMode::Hud);
            assert_eq!(state.completed_build_count, 1);
        }

        let summaries = summaries.lock().unwrap().clone();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].touches(StateRegions::TERMINAL | StateRegions::BUILDS));

        ctx.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_noop_batch_does_not_notify() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut store = Store::new();
        store.add_subscriber(Recorder::new("a", &events));
        let handle = store.handle();
        handle.dispatch(Action::None);

        let ctx = CancellationToken::new();
        let task = tokio::spawn(store.run(ctx.clone()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        ctx.cancel();
        task.await.unwrap().unwrap();

        assert_eq!(*events.lock().unwrap(), vec!["setup:a", "teardown:a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_subscriber_retried_with_backoff() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut flaky = Recorder::new("flaky", &events);
        flaky.failures_left = 2;
        let summaries = flaky.summaries.clone();

        let mut store = Store::new();
        store.add_subscriber(flaky);
        let handle = store.handle();
        handle.dispatch(build_completed("api"));

        let ctx = CancellationToken::new();
        let task = tokio::spawn(store.run(ctx.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(summaries.lock().unwrap().len(), 1);

        // first retry after 1s
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(summaries.lock().unwrap().len(), 2);

        // changes arriving during backoff are merged into the retry
        handle.dispatch(Action::SwitchTerminalMode(TerminalMode::Hud));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(summaries.lock().unwrap().len(), 2);

        // second retry after 2s more
        tokio::time::sleep(Duration::from_millis(1600)).await;
        let summaries = summaries.lock().unwrap().clone();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[1].last_backoff, Duration::from_secs(1));
        assert_eq!(summaries[2].last_backoff, Duration::from_secs(2));
        assert!(summaries[2].touches(StateRegions::BUILDS));
        assert!(summaries[2].touches(StateRegions::TERMINAL));

        ctx.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_subscriber_does_not_stop_others() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorder = Recorder::new("after", &events);
        let summaries = recorder.summaries.clone();

        let mut store = Store::new();
        store.add_subscriber(Panicker);
        store.add_subscriber(recorder);
        let handle = store.handle();
        handle.dispatch(build_completed("api"));
        handle.dispatch(build_completed("api"));

        let ctx = CancellationToken::new();
        let task = tokio::spawn(store.run(ctx.clone()));
        tokio::time::sleep(Duration::from_millis(10)).await;

        handle.dispatch(build_completed("web"));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(summaries.lock().unwrap().len(), 2);
        assert_eq!(handle.read_state().completed_build_count, 3);

        ctx.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_action_stops_store() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut store = Store::new();
        store.add_subscriber(Recorder::new("a", &events));
        let handle = store.handle();
        handle.dispatch(Action::error("cluster unreachable"));

        let result = store.run(CancellationToken::new()).await;

        assert!(matches!(result, Err(StoreError::Fatal(ref m)) if m == "cluster unreachable"));
        assert_eq!(
            handle.read_state().fatal_error.as_deref(),
            Some("cluster unreachable")
        );
        assert_eq!(
            *events.lock().unwrap(),
            vec!["setup:a", "change:a", "teardown:a"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_dispatch_applies_every_action() {
        let store = Store::new();
        let handle = store.handle();
        let ctx = CancellationToken::new();
        let task = tokio::spawn(store.run(ctx.clone()));

        let mut producers = Vec::new();
        for i in 0..8 {
            let handle = handle.clone();
            producers.push(tokio::spawn(async move {
                for _ in 0..25 {
                    handle.dispatch(build_completed(&format!("m{}", i)));
                    tokio::task::yield_now().await;
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(handle.read_state().completed_build_count, 200);

        ctx.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_build_completed_counts_once() {
        let store = Store::new();
        let handle = store.handle();
        let ctx = CancellationToken::new();
        let task = tokio::spawn(store.run(ctx.clone()));

        for expected in 1..=3 {
            handle.dispatch(build_completed("api"));
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(handle.read_state().completed_build_count, expected);
        }

        ctx.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_action_leaves_state_and_loop_intact() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorder = Recorder::new("a", &events);
        let summaries = recorder.summaries.clone();

        let mut store = Store::new();
        store.add_subscriber(recorder);
        let handle = store.handle();
        let ctx = CancellationToken::new();
        let task = tokio::spawn(store.run(ctx.clone()));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let before = handle.read_state().clone();
        handle.dispatch(Action::Extension {
            kind: "session-updated".to_string(),
            payload: serde_json::json!({ "name": "api", "ready": true }),
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*handle.read_state(), before);
        assert!(summaries.lock().unwrap().is_empty());

        handle.dispatch(build_completed("api"));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(handle.read_state().completed_build_count, 1);
        assert_eq!(summaries.lock().unwrap().len(), 1);

        ctx.cancel();
        task.await.unwrap().unwrap();
    }
}
