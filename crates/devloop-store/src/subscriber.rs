//! Subscriber protocol
//!
//! Subscribers are the engine's side effects. The store notifies every
//! subscriber once per reduced batch, on the reduction worker, in
//! registration order.
//!
//! ## Design
//!
//! ```text
//! dispatch → queue → reducer (write lock) → ChangeSummary → subscribers
//!                                                              │
//!                     dispatch ◄── background tasks ◄──────────┘
//! ```
//!
//! `on_change` must return quickly. Anything slow (network, sleeps, reading
//! the terminal) belongs in a spawned task that reports back by dispatching.
//!
//! ## Example
//!
//! ```ignore
//! struct BuildCounter(usize);
//!
//! impl Subscriber for BuildCounter {
//!     fn on_change(
//!         &mut self,
//!         _ctx: &CancellationToken,
//!         store: &StoreHandle,
//!         summary: &ChangeSummary,
//!     ) -> anyhow::Result<()> {
//!         if summary.touches(StateRegions::BUILDS) {
//!             self.0 = store.read_state().completed_build_count;
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use crate::change_summary::ChangeSummary;
use crate::store::{StoreError, StoreHandle};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// First retry delay after a failed notification
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Retry delays stop doubling here
pub const MAX_BACKOFF: Duration = Duration::from_secs(15);

/// A side-effecting consumer of state changes
pub trait Subscriber: Send {
    /// Name used in logs
    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Called once, in registration order, before the first notification
    ///
    /// An error here aborts the store's startup.
    fn set_up(&mut self, _ctx: &CancellationToken, _store: &StoreHandle) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after each batch of changes
    ///
    /// An error is logged and the notification is retried with backoff,
    /// merged with whatever changed in the meantime.
    fn on_change(
        &mut self,
        ctx: &CancellationToken,
        store: &StoreHandle,
        summary: &ChangeSummary,
    ) -> anyhow::Result<()>;

    /// Called once, in reverse registration order, when the store stops
    fn tear_down(&mut self) {}
}

struct SubscriberEntry {
    subscriber: Box<dyn Subscriber>,
    /// Changes not yet delivered because the subscriber is backing off
    pending: Option<ChangeSummary>,
    retry_at: Option<Instant>,
    backoff: Duration,
    set_up: bool,
}

impl SubscriberEntry {
    fn new(subscriber: Box<dyn Subscriber>) -> Self {
        Self {
            subscriber,
            pending: None,
            retry_at: None,
            backoff: Duration::ZERO,
            set_up: false,
        }
    }

    /// Deliver `summary`, or queue it while the subscriber is backing off
    fn notify(
        &mut self,
        ctx: &CancellationToken,
        store: &StoreHandle,
        summary: &ChangeSummary,
        now: Instant,
    ) {
        let mut active = self.pending.take().unwrap_or_default();
        active.add(summary);

        match self.retry_at {
            Some(at) if at > now => self.pending = Some(active),
            _ => self.deliver(ctx, store, active),
        }
    }

    fn notify_if_due(&mut self, ctx: &CancellationToken, store: &StoreHandle, now: Instant) {
        if matches!(self.retry_at, Some(at) if at <= now) {
            let active = self.pending.take().unwrap_or_default();
            self.deliver(ctx, store, active);
        }
    }

    fn deliver(&mut self, ctx: &CancellationToken, store: &StoreHandle, mut summary: ChangeSummary) {
        self.retry_at = None;
        let name = self.subscriber.name();
        let subscriber = &mut self.subscriber;
        let result = catch_unwind(AssertUnwindSafe(|| {
            subscriber.on_change(ctx, store, &summary)
        }));

        match result {
            Ok(Ok(())) => self.backoff = Duration::ZERO,
            Ok(Err(err)) => {
                let backoff = next_backoff(self.backoff);
                if self.backoff.is_zero() {
                    log::debug!("Subscriber {} failed, retrying in {:?}: {:#}", name, backoff, err);
                } else {
                    log::error!("Subscriber {} failed, retrying in {:?}: {:#}", name, backoff, err);
                }
                self.backoff = backoff;
                summary.last_backoff = backoff;
                self.pending = Some(summary);
                self.retry_at = Some(Instant::now() + backoff);
            }
            Err(panic) => {
                log::error!("Subscriber {} panicked: {}", name, panic_message(&*panic));
                self.backoff = Duration::ZERO;
            }
        }
    }
}

fn next_backoff(current: Duration) -> Duration {
    if current.is_zero() {
        INITIAL_BACKOFF
    } else {
        (current * 2).min(MAX_BACKOFF)
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Registered subscribers, in registration order
#[derive(Default)]
pub struct SubscriberList {
    entries: Vec<SubscriberEntry>,
}

impl SubscriberList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<S: Subscriber + 'static>(&mut self, subscriber: S) {
        self.entries.push(SubscriberEntry::new(Box::new(subscriber)));
    }

    pub fn add_boxed(&mut self, subscriber: Box<dyn Subscriber>) {
        self.entries.push(SubscriberEntry::new(subscriber));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set up every subscriber in registration order, stopping at the first error
    pub fn set_up(&mut self, ctx: &CancellationToken, store: &StoreHandle) -> Result<(), StoreError> {
        for entry in &mut self.entries {
            let name = entry.subscriber.name();
            entry
                .subscriber
                .set_up(ctx, store)
                .map_err(|err| StoreError::SetUp {
                    subscriber: name.to_string(),
                    message: format!("{:#}", err),
                })?;
            entry.set_up = true;
            log::debug!("Subscriber {} set up", name);
        }
        Ok(())
    }

    pub fn notify_all(&mut self, ctx: &CancellationToken, store: &StoreHandle, summary: &ChangeSummary) {
        let now = Instant::now();
        for entry in &mut self.entries {
            entry.notify(ctx, store, summary, now);
        }
    }

    /// Retry subscribers whose backoff has elapsed
    pub fn notify_due(&mut self, ctx: &CancellationToken, store: &StoreHandle) {
        let now = Instant::now();
        for entry in &mut self.entries {
            entry.notify_if_due(ctx, store, now);
        }
    }

    /// Earliest pending retry, if any subscriber is backing off
    pub fn next_retry(&self) -> Option<Instant> {
        self.entries.iter().filter_map(|e| e.retry_at).min()
    }

    /// Tear down every set-up subscriber in reverse registration order
    pub fn tear_down(&mut self) {
        for entry in self.entries.iter_mut().rev() {
            if !std::mem::take(&mut entry.set_up) {
                continue;
            }
            let name = entry.subscriber.name();
            let subscriber = &mut entry.subscriber;
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| subscriber.tear_down())) {
                log::error!("Subscriber {} panicked in tear down: {}", name, panic_message(&*panic));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_up_to_max() {
        let mut backoff = Duration::ZERO;
        let mut seen = Vec::new();
        for _ in 0..6 {
            backoff = next_backoff(backoff);
            seen.push(backoff.as_secs());
        }
        assert_eq!(seen, vec![1, 2, 4, 8, 15, 15]);
    }

    #[test]
    fn test_default_name_is_type_name() {
        struct Quiet;
        impl Subscriber for Quiet {
            fn on_change(
                &mut self,
                _ctx: &CancellationToken,
                _store: &StoreHandle,
                _summary: &ChangeSummary,
            ) -> anyhow::Result<()> {
                Ok(())
            }
        }
        assert_eq!(Quiet.name(), "Quiet");
    }
}
