// carepath/src/state/mod.rs

//! Defines `WorkflowState`, the actions that change it, and weighted progress.

pub mod action;
pub mod progress;
pub mod reducer;

pub use action::WorkflowAction;
pub use progress::compute_progress;
pub use reducer::WorkflowState;
