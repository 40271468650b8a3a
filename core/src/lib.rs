// carepath/src/lib.rs

//! Carepath: a configurable, conditionally-branching consultation workflow
//! engine for clinical data-entry wizards.
//!
//! A workflow is an ordered list of typed steps loaded from a JSON
//! configuration. Each step may carry visibility conditions over the patient
//! record or data captured by earlier steps. Carepath provides:
//!  - A pure visibility evaluator over patient and step data.
//!  - A reducer (`WorkflowState::dispatch`) tracking the current step, the
//!    visible and completed steps, captured data and weighted progress.
//!  - A render-type-keyed registry of async step handlers run on "next".
//!  - `WorkflowSession`, which drives a run and performs the final save and
//!    optional patient sync against an OpenMRS-compatible server.

pub mod api;
pub mod core;
pub mod definition;
pub mod error;
pub mod session;
pub mod settings;
pub mod state;
pub mod validation;
pub mod visibility;

// --- Re-exports for the Public API ---

pub use crate::core::control::{SaveOutcome, StepAdvance, StepBlock};
pub use crate::core::patient::{Patient, Visit};
pub use crate::core::payload::{
  AllergyEntry, AppointmentEntry, ConditionEntry, DrugOrder, FormPayload, MedicationPayload, Observation, StepPayload,
};
pub use crate::core::shared_state::SharedState;

pub use crate::definition::{
  ConditionOperator, ConditionSource, LogicalOperator, RenderType, StepCondition, StepVisibility, WorkflowConfig,
  WorkflowConfigRecord, WorkflowStep,
};

pub use crate::visibility::{evaluate_condition, is_step_visible, visible_steps, VisibilityContext};

pub use crate::state::{compute_progress, WorkflowAction, WorkflowState};

pub use crate::session::{NextOutcome, StepContext, StepHandler, StepRegistry, WorkflowSession};

pub use crate::api::{ClinicalApi, RestClinicalApi};

pub use crate::error::{ApiErrorKind, WorkflowError, WorkflowResult};
pub use crate::settings::Settings;
pub use crate::validation::ValidationErrors;

/*
    Typical run:
    1. Build a `StepRegistry` at startup (`StepRegistry::with_defaults()`, plus
       `register` for custom render types) and wrap it in an `Arc`.
    2. Load `Settings::from_env()` and create a `RestClinicalApi`.
    3. `WorkflowSession::open(workflow_uuid, patient, visit, registry, api, &settings)`.
    4. Feed in-progress edits through `update_step_data`, form submits through
       `complete_step`, and call `next().await` when the user moves on.
    5. On the last step, `save().await`, then `close()`.
*/
