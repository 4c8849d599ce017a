//! Dispatcher lets producers queue actions for the store

use crate::actions::Action;
use tokio::sync::mpsc;

/// Dispatcher queues actions for the reduction worker
///
/// Dispatch never blocks and never runs the reducer inline: actions are
/// reduced in the next worker iteration, in dispatch order.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Action>,
}

impl Dispatcher {
    pub fn new(tx: mpsc::UnboundedSender<Action>) -> Self {
        Self { tx }
    }

    /// Queue an action
    ///
    /// Fails only when the store is gone, in which case the action is
    /// dropped and logged.
    pub fn dispatch(&self, action: Action) {
        if let Err(e) = self.tx.send(action) {
            log::debug!(
                "Dropping {} action, store is no longer running",
                e.0.kind().name()
            );
        }
    }
}
