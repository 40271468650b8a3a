// carepath/src/definition/mod.rs

//! Defines the immutable workflow configuration: steps, render types and
//! visibility rules.

pub mod condition;
pub mod step;
pub mod workflow;

pub use condition::{ConditionOperator, ConditionSource, LogicalOperator, StepCondition, StepVisibility};
pub use step::{RenderType, WorkflowStep};
pub use workflow::{WorkflowConfig, WorkflowConfigRecord};
