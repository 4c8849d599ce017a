//! Engine state store
//!
//! The coordination kernel of devloop: one versioned `EngineState`, changed
//! only by reducing `Action`s on a single worker, with `Subscriber`s notified
//! after each batch of changes.
//!
//! - `Store`: owns state, queue and subscribers; `run` is the worker
//! - `reducers`: the pure state transitions
//! - `Subscriber` / `ChangeSummary`: the notification protocol
//! - `patterns`: one-shot, debounced polling and diff helpers for subscribers
//! - `testing`: `TestingStore`, a recording store for subscriber tests

pub mod actions;
pub mod change_summary;
pub mod dispatcher;
pub mod patterns;
pub mod reducers;
pub mod state;
pub mod store;
pub mod subscriber;
pub mod testing;

pub use actions::{Action, ActionKind};
pub use change_summary::{ChangeSummary, StateRegions};
pub use dispatcher::Dispatcher;
pub use state::EngineState;
pub use store::{RStore, Reducer, StateReadGuard, Store, StoreError, StoreHandle};
pub use subscriber::{Subscriber, SubscriberList, INITIAL_BACKOFF, MAX_BACKOFF};
pub use testing::{TestingStore, TestingStoreError};
