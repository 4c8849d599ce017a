//! Reducers
//!
//! `app_reducer::reduce` is the root reducer the store runs for every action.
//! It hands each action to exactly one sub-reducer, which mutates its region
//! of the state and records what it touched in the batch's change summary.

pub mod app_reducer;
pub mod build_reducer;
pub mod cloud_reducer;
pub mod log_reducer;
pub mod runtime_reducer;
pub mod settings_reducer;

pub use app_reducer::reduce;
