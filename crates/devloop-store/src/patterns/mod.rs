//! Building blocks shared by subscribers
//!
//! - `OneShot`: start something exactly once
//! - `PollGate`: at most one request in flight, with a cooldown after errors
//! - `DiffTracker`: only act on keys whose value changed

mod diff_tracker;
mod one_shot;
mod poll_gate;

pub use diff_tracker::DiffTracker;
pub use one_shot::OneShot;
pub use poll_gate::{PollGate, PollMode, PollPermit};
