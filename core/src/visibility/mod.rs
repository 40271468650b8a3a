// carepath/src/visibility/mod.rs

//! Step visibility: evaluates each step's conditional-display rules against the
//! patient record and the data other steps have captured.

pub mod evaluator;
pub mod operators;

pub use evaluator::{evaluate_condition, is_step_visible, visible_steps, VisibilityContext};
