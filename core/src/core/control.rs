// carepath/src/core/control.rs

//! Signals returned by step handlers and the outcome of a session save.

use crate::core::payload::StepPayload;
use crate::error::ApiErrorKind;
use crate::validation::ValidationErrors;

/// Decision of a step handler when the user asks to move on.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAdvance {
  /// Complete the step with this payload and move to the next visible step.
  Complete(StepPayload),
  /// Keep the user on the current step.
  Blocked(StepBlock),
}

/// Why a step could not be left, and what changed while trying.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepBlock {
  /// Message shown to the user.
  pub warning: String,
  /// Per-field problems to show inline.
  pub errors: ValidationErrors,
  /// Set when a remote call failed.
  pub api_error: Option<ApiErrorKind>,
  /// Buffered data updated by partial work (e.g. orders that did get saved).
  /// Stored back as in-progress data so a retry does not redo it.
  pub buffered: Option<StepPayload>,
}

impl StepBlock {
  pub fn warning(message: impl Into<String>) -> Self {
    Self {
      warning: message.into(),
      ..Default::default()
    }
  }

  pub fn with_errors(mut self, errors: ValidationErrors) -> Self {
    self.errors = errors;
    self
  }

  pub fn with_api_error(mut self, kind: ApiErrorKind) -> Self {
    self.api_error = Some(kind);
    self
  }

  pub fn with_buffered(mut self, payload: StepPayload) -> Self {
    self.buffered = Some(payload);
    self
  }
}

/// Result of the final save.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaveOutcome {
  /// Identifier the persistence endpoint assigned to the submission, if any.
  pub submission_uuid: Option<String>,
  /// Whether the external patient sync ran and succeeded.
  pub patient_synced: bool,
  /// Set when the save went through but the patient sync failed.
  pub sync_error: Option<String>,
}
