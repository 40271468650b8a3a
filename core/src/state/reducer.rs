// carepath/src/state/reducer.rs

//! Contains `WorkflowState` and its reducer, `WorkflowState::dispatch`.
//!
//! The state is only ever changed through `dispatch`. After every action that
//! changes captured data the visible-step list is recomputed, because later
//! steps' visibility may depend on earlier steps' data.

use crate::core::patient::{Patient, Visit};
use crate::core::payload::StepPayload;
use crate::definition::step::WorkflowStep;
use crate::definition::workflow::WorkflowConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::state::action::WorkflowAction;
use crate::state::progress::compute_progress;
use crate::visibility::{visible_steps, VisibilityContext};
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Per-session wizard state.
#[derive(Debug, Clone)]
pub struct WorkflowState {
  config: Arc<WorkflowConfig>,
  patient: Patient,
  visit: Option<Visit>,
  reference_date: NaiveDate,

  current_step_index: usize,
  visible_steps: Vec<WorkflowStep>,
  completed_steps: BTreeSet<String>,
  steps_data: HashMap<String, StepPayload>,
  progress: f64,
  is_last_step: bool,
}

impl WorkflowState {
  /// Initial state for a session, computing patient ages as of today (UTC).
  pub fn new(config: Arc<WorkflowConfig>, patient: Patient, visit: Option<Visit>) -> Self {
    Self::new_on(config, patient, visit, Utc::now().date_naive())
  }

  /// Initial state with an explicit reference date for age-based conditions.
  pub fn new_on(
    config: Arc<WorkflowConfig>,
    patient: Patient,
    visit: Option<Visit>,
    reference_date: NaiveDate,
  ) -> Self {
    let mut state = Self {
      config,
      patient,
      visit,
      reference_date,
      current_step_index: 0,
      visible_steps: Vec::new(),
      completed_steps: BTreeSet::new(),
      steps_data: HashMap::new(),
      progress: 0.0,
      is_last_step: false,
    };
    state.refresh_visibility();
    event!(
      Level::DEBUG,
      workflow_uuid = %state.config.uuid,
      configured = state.config.steps.len(),
      visible = state.visible_steps.len(),
      "Workflow state initialized."
    );
    state
  }

  // --- Read-only accessors ---

  pub fn config(&self) -> &WorkflowConfig {
    &self.config
  }

  pub fn patient_uuid(&self) -> &str {
    &self.patient.uuid
  }

  pub fn patient(&self) -> &Patient {
    &self.patient
  }

  pub fn visit(&self) -> Option<&Visit> {
    self.visit.as_ref()
  }

  pub fn current_step_index(&self) -> usize {
    self.current_step_index
  }

  pub fn current_step(&self) -> Option<&WorkflowStep> {
    self.visible_steps.get(self.current_step_index)
  }

  pub fn visible_steps(&self) -> &[WorkflowStep] {
    &self.visible_steps
  }

  pub fn visible_step_ids(&self) -> Vec<&str> {
    self.visible_steps.iter().map(|s| s.id.as_str()).collect()
  }

  pub fn completed_steps(&self) -> &BTreeSet<String> {
    &self.completed_steps
  }

  pub fn is_completed(&self, step_id: &str) -> bool {
    self.completed_steps.contains(step_id)
  }

  pub fn steps_data(&self) -> &HashMap<String, StepPayload> {
    &self.steps_data
  }

  pub fn step_data(&self, step_id: &str) -> Option<&StepPayload> {
    self.steps_data.get(step_id)
  }

  /// Weighted completion, 0 to 100.
  pub fn progress(&self) -> f64 {
    self.progress
  }

  pub fn is_last_step(&self) -> bool {
    self.is_last_step
  }

  // --- Reducer ---

  /// Applies `action`.
  ///
  /// `GoToStep` with an index outside the visible steps, and data actions for
  /// steps the configuration does not define, are programmer errors: they
  /// return an error and leave the state untouched.
  #[instrument(
    name = "WorkflowState::dispatch",
    skip_all,
    fields(action = action.name(), current_step_index = self.current_step_index),
    err(Display)
  )]
  pub fn dispatch(&mut self, action: WorkflowAction) -> WorkflowResult<()> {
    match action {
      WorkflowAction::GoToStep { index } => {
        if index >= self.visible_steps.len() {
          event!(Level::ERROR, index, visible = self.visible_steps.len(), "Attempted to go to a step that is not visible.");
          return Err(WorkflowError::StepNotVisible {
            index,
            visible_count: self.visible_steps.len(),
          });
        }
        self.current_step_index = index;
        self.update_is_last_step();
      }
      WorkflowAction::GoToNextStep => {
        self.current_step_index = self.clamped(self.current_step_index + 1);
        self.update_is_last_step();
      }
      WorkflowAction::GoToPreviousStep => {
        self.current_step_index = self.current_step_index.saturating_sub(1);
        self.update_is_last_step();
      }
      WorkflowAction::CompleteStep { step_id, data } => {
        self.ensure_configured(&step_id)?;
        self.warn_on_payload_mismatch(&step_id, &data);
        self.completed_steps.insert(step_id.clone());
        self.steps_data.insert(step_id.clone(), data);
        self.refresh_visibility();
        self.current_step_index = self.clamped(self.current_step_index + 1);
        self.update_is_last_step();
        self.progress = compute_progress(&self.config, &self.completed_steps);
        event!(Level::INFO, %step_id, progress = self.progress, next_index = self.current_step_index, "Step completed.");
      }
      WorkflowAction::UpdateStepData { step_id, data } => {
        self.ensure_configured(&step_id)?;
        self.warn_on_payload_mismatch(&step_id, &data);
        self.steps_data.insert(step_id.clone(), data);
        self.refresh_visibility();
        self.current_step_index = self.clamped(self.current_step_index);
        self.update_is_last_step();
        event!(Level::DEBUG, %step_id, "Step data updated.");
      }
      WorkflowAction::Unknown => {
        event!(Level::WARN, "Unknown workflow action ignored.");
      }
    }
    Ok(())
  }

  // --- Internal helpers ---

  fn ensure_configured(&self, step_id: &str) -> WorkflowResult<()> {
    if self.config.contains_step(step_id) {
      Ok(())
    } else {
      Err(WorkflowError::StepNotFound {
        step_id: step_id.to_string(),
      })
    }
  }

  fn warn_on_payload_mismatch(&self, step_id: &str, data: &StepPayload) {
    if let Some(step) = self.config.step(step_id) {
      if !data.matches(&step.render_type) {
        event!(Level::WARN, %step_id, render_type = %step.render_type, "Step payload variant does not match the step's render type.");
      }
    }
  }

  fn refresh_visibility(&mut self) {
    let ctx = VisibilityContext::new(&self.patient, &self.steps_data, self.reference_date);
    self.visible_steps = visible_steps(&self.config, &ctx);
    self.current_step_index = self.clamped(self.current_step_index);
    self.update_is_last_step();
  }

  /// Clamps `index` into the visible range (0 when nothing is visible).
  fn clamped(&self, index: usize) -> usize {
    index.min(self.visible_steps.len().saturating_sub(1))
  }

  fn update_is_last_step(&mut self) {
    self.is_last_step = !self.visible_steps.is_empty() && self.current_step_index == self.visible_steps.len() - 1;
  }
}
