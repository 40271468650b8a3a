// carepath/src/session/container.rs

//! Defines `WorkflowSession`, the orchestration surface a host drives: it owns
//! one session's `WorkflowState`, dispatches "next" to the current step's
//! handler, and performs the final save.

use crate::api::sync::{PatientSyncMappings, PatientSyncRequest};
use crate::api::{ClinicalApi, WorkflowSubmission};
use crate::core::control::{SaveOutcome, StepAdvance, StepBlock};
use crate::core::patient::{Patient, Visit};
use crate::core::payload::StepPayload;
use crate::core::shared_state::SharedState;
use crate::definition::step::WorkflowStep;
use crate::definition::workflow::WorkflowConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::session::handler::StepContext;
use crate::session::registry::StepRegistry;
use crate::settings::Settings;
use crate::state::{WorkflowAction, WorkflowState};
use chrono::Utc;
use serde_json::Map;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{event, span, Instrument, Level, Span};
use uuid::Uuid;

/// Result of asking to move past the current step.
#[derive(Debug, Clone, PartialEq)]
pub enum NextOutcome {
  /// The step was completed; the session moved to the next visible step
  /// (or stayed on the last one).
  Completed { step_id: String },
  /// The handler kept the user on the step.
  Blocked(StepBlock),
}

pub struct WorkflowSession {
  id: Uuid,
  state: SharedState<WorkflowState>,
  registry: Arc<StepRegistry>,
  api: Arc<dyn ClinicalApi>,
  patient_sync: Option<PatientSyncMappings>,
  /// Set while a `next()` call is awaiting its handler.
  advancing: AtomicBool,
  span: Span,
}

/// Clears the session's `advancing` flag when dropped, including when the
/// `next()` future is cancelled.
struct AdvanceGuard<'a>(&'a AtomicBool);

impl Drop for AdvanceGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

impl WorkflowSession {
  /// Starts a session over an already-resolved configuration.
  pub fn new(state: WorkflowState, registry: Arc<StepRegistry>, api: Arc<dyn ClinicalApi>) -> Self {
    let id = Uuid::new_v4();
    let span = span!(
      Level::INFO,
      "workflow_session",
      session_id = %id,
      workflow_uuid = %state.config().uuid,
      patient_uuid = %state.patient_uuid()
    );
    span.in_scope(|| {
      event!(Level::INFO, visible_steps = state.visible_steps().len(), "Workflow session opened.");
    });
    Self {
      id,
      state: SharedState::new(state),
      registry,
      api,
      patient_sync: None,
      advancing: AtomicBool::new(false),
      span,
    }
  }

  /// Enables the patient sync after save, using these code tables.
  pub fn with_patient_sync(mut self, mappings: PatientSyncMappings) -> Self {
    self.patient_sync = Some(mappings);
    self
  }

  /// Loads the workflow configuration from the server and opens a session on it.
  ///
  /// A record without clob data fails with `WorkflowError::MissingClobData`;
  /// hosts show their workflow-error screen for it.
  pub async fn open(
    workflow_uuid: &str,
    patient: Patient,
    visit: Option<Visit>,
    registry: Arc<StepRegistry>,
    api: Arc<dyn ClinicalApi>,
    settings: &Settings,
  ) -> WorkflowResult<Self> {
    let record = api.fetch_workflow_config(workflow_uuid).await?;
    let config = WorkflowConfig::from_record(record)?;

    for step in &config.steps {
      if !registry.contains(&step.render_type) {
        event!(Level::WARN, step_id = %step.id, render_type = %step.render_type, "Step has no registered handler.");
      }
    }

    let state = WorkflowState::new(Arc::new(config), patient, visit);
    let mut session = Self::new(state, registry, api);
    if let Some(sync) = &settings.patient_sync {
      session = session.with_patient_sync(sync.mappings.clone());
    }
    Ok(session)
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  /// Shared handle to the session state, for hosts that render from it.
  pub fn state(&self) -> SharedState<WorkflowState> {
    self.state.clone()
  }

  pub fn snapshot(&self) -> WorkflowState {
    self.state.snapshot()
  }

  pub fn current_step(&self) -> Option<WorkflowStep> {
    self.state.read().current_step().cloned()
  }

  /// Applies an action directly.
  pub fn dispatch(&self, action: WorkflowAction) -> WorkflowResult<()> {
    let _entered = self.span.enter();
    self.state.write().dispatch(action)
  }

  /// Stores in-progress data for a step (e.g. live medication-basket edits).
  pub fn update_step_data(&self, step_id: &str, data: StepPayload) -> WorkflowResult<()> {
    self.dispatch(WorkflowAction::update(step_id, data))
  }

  /// Completes a step whose UI produced its final data through its own
  /// callback (e.g. a form submit), bypassing the step handler.
  pub fn complete_step(&self, step_id: &str, data: StepPayload) -> WorkflowResult<()> {
    self.dispatch(WorkflowAction::complete(step_id, data))
  }

  pub fn back(&self) -> WorkflowResult<()> {
    self.dispatch(WorkflowAction::GoToPreviousStep)
  }

  pub fn go_to(&self, index: usize) -> WorkflowResult<()> {
    self.dispatch(WorkflowAction::GoToStep { index })
  }

  /// Runs the current step's handler and completes the step if it allows.
  ///
  /// Handler errors are returned as-is and leave the state unchanged, so the
  /// user stays on the step and can retry. A call made while another one is
  /// still running fails with `WorkflowError::AdvanceInProgress` without
  /// touching the handler.
  pub async fn next(&self) -> WorkflowResult<NextOutcome> {
    self.next_inner().instrument(self.span.clone()).await
  }

  async fn next_inner(&self) -> WorkflowResult<NextOutcome> {
    let ctx = {
      let state = self.state.read();
      let step = state
        .current_step()
        .cloned()
        .ok_or_else(|| WorkflowError::Internal("workflow has no visible steps".to_string()))?;
      StepContext {
        buffered: state.step_data(&step.id).cloned(),
        step,
        patient_uuid: state.patient_uuid().to_string(),
        visit: state.visit().cloned(),
        api: self.api.clone(),
      }
    };

    let step_id = ctx.step.id.clone();
    if self
      .advancing
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      event!(Level::WARN, %step_id, "Ignoring next while a step is still being advanced.");
      return Err(WorkflowError::AdvanceInProgress { step_id });
    }
    let _guard = AdvanceGuard(&self.advancing);

    let handler = self.registry.get(&ctx.step.render_type)?;
    event!(Level::DEBUG, %step_id, render_type = %ctx.step.render_type, "Running step handler.");

    let seen = ctx.buffered.clone();
    let advance = match handler.on_next(ctx).await {
      Ok(advance) => advance,
      Err(e) => {
        event!(Level::ERROR, %step_id, error = %e, "Step handler failed.");
        return Err(e);
      }
    };

    let mut state = self.state.write();
    let still_current = state.current_step().is_some_and(|s| s.id == step_id);
    let data_unchanged = state.step_data(&step_id) == seen.as_ref();

    match advance {
      StepAdvance::Complete(payload) if still_current => {
        state.dispatch(WorkflowAction::complete(step_id.clone(), payload))?;
        Ok(NextOutcome::Completed { step_id })
      }
      StepAdvance::Complete(payload) => {
        // Keep what the handler produced (e.g. saved order uuids) without
        // moving the user, who navigated away meanwhile.
        event!(Level::WARN, %step_id, "Current step changed while its handler ran; not completing it.");
        state.dispatch(WorkflowAction::update(step_id.clone(), payload.clone()))?;
        Ok(NextOutcome::Blocked(
          StepBlock::warning("The step changed while it was being saved. Return to it to continue.")
            .with_buffered(payload),
        ))
      }
      StepAdvance::Blocked(mut block) => {
        if let Some(buffered) = block.buffered.take() {
          if data_unchanged {
            state.dispatch(WorkflowAction::update(step_id.clone(), buffered.clone()))?;
          } else {
            event!(Level::WARN, %step_id, "Step data changed while its handler ran; keeping the newer data.");
          }
          block.buffered = Some(buffered);
        }
        event!(Level::INFO, %step_id, warning = %block.warning, "Step advance blocked.");
        Ok(NextOutcome::Blocked(block))
      }
    }
  }

  /// The submission the final save would send right now.
  pub fn submission(&self) -> WorkflowSubmission {
    let state = self.state.read();
    let mut steps_data = Map::new();
    // Configuration order keeps the submitted document stable.
    for step in &state.config().steps {
      if let Some(payload) = state.step_data(&step.id) {
        steps_data.insert(step.id.clone(), payload.to_value());
      }
    }
    WorkflowSubmission {
      workflow_config: state.config().uuid.clone(),
      workflow_version: state.config().version.clone(),
      patient: state.patient_uuid().to_string(),
      visit: state.visit().map(|v| v.uuid.clone()),
      completed_steps: state.completed_steps().iter().cloned().collect(),
      steps_data,
      submitted_at: Utc::now(),
    }
  }

  /// Submits all captured step data, then runs the patient sync if enabled.
  ///
  /// A failed save is returned as an error. A failed sync after a successful
  /// save is reported in `SaveOutcome::sync_error` instead, since the data is
  /// already stored.
  pub async fn save(&self) -> WorkflowResult<SaveOutcome> {
    self.save_inner().instrument(self.span.clone()).await
  }

  async fn save_inner(&self) -> WorkflowResult<SaveOutcome> {
    let submission = self.submission();
    event!(Level::INFO, steps = submission.steps_data.len(), "Saving workflow data.");
    let submission_uuid = match self.api.save_workflow_data(&submission).await {
      Ok(uuid) => uuid,
      Err(e) => {
        event!(Level::ERROR, error = %e, "Saving workflow data failed.");
        return Err(e);
      }
    };

    let mut outcome = SaveOutcome {
      submission_uuid,
      ..Default::default()
    };

    if let Some(mappings) = &self.patient_sync {
      match self.sync_patient(mappings, &submission).await {
        Ok(synced) => outcome.patient_synced = synced,
        Err(e) => {
          event!(Level::WARN, error = %e, "Patient sync failed after save.");
          outcome.sync_error = Some(e.to_string());
        }
      }
    }
    Ok(outcome)
  }

  /// Returns `Ok(false)` when the patient has no enrollment worth syncing.
  async fn sync_patient(&self, mappings: &PatientSyncMappings, submission: &WorkflowSubmission) -> WorkflowResult<bool> {
    let enrollments = self.api.fetch_program_enrollments(&submission.patient).await?;
    let mapped = mappings.map_enrollments(&enrollments)?;
    if mapped.is_empty() {
      event!(Level::DEBUG, "No mapped program enrollments, patient sync skipped.");
      return Ok(false);
    }
    let request = PatientSyncRequest {
      patient_uuid: submission.patient.clone(),
      visit_uuid: submission.visit.clone(),
      enrollments: mapped,
    };
    self.api.sync_patient(&request).await?;
    event!(Level::INFO, enrollments = request.enrollments.len(), "Patient synced.");
    Ok(true)
  }

  /// Ends the session. In-progress state is discarded; it is returned only so
  /// hosts can inspect what was left unsaved.
  pub fn close(self) -> WorkflowState {
    let _entered = self.span.enter();
    let state = self.state.snapshot();
    event!(Level::INFO, completed = state.completed_steps().len(), "Workflow session closed.");
    state
  }
}
