// carepath/src/session/mod.rs

//! The orchestration surface: step handlers, the registry that maps render
//! types to them, and `WorkflowSession`, which ties one patient's run together.

pub mod container;
pub mod handler;
pub mod registry;

pub use container::{NextOutcome, WorkflowSession};
pub use handler::{FormStepHandler, MedicationStepHandler, SnapshotStepHandler, StepContext, StepHandler};
pub use registry::StepRegistry;
