// carepath/src/state/action.rs

//! Actions accepted by the workflow reducer.

use crate::core::payload::StepPayload;
use serde::{Deserialize, Serialize};

/// A state transition request. Hosts may also send these as JSON
/// (`{"type": "GO_TO_STEP", "index": 2}`); unrecognised types decode to `Unknown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowAction {
  /// Jump to a visible-step index. Fails when the index is not visible.
  GoToStep { index: usize },
  /// Move forward one visible step; a no-op on the last one.
  GoToNextStep,
  /// Move back one visible step; a no-op on the first one.
  GoToPreviousStep,
  /// Mark a step completed with its final data and advance.
  CompleteStep {
    #[serde(rename = "stepId")]
    step_id: String,
    data: StepPayload,
  },
  /// Store in-progress data for a step without completing it or moving.
  UpdateStepData {
    #[serde(rename = "stepId")]
    step_id: String,
    data: StepPayload,
  },
  #[serde(other)]
  Unknown,
}

impl WorkflowAction {
  pub fn complete(step_id: impl Into<String>, data: StepPayload) -> Self {
    WorkflowAction::CompleteStep {
      step_id: step_id.into(),
      data,
    }
  }

  pub fn update(step_id: impl Into<String>, data: StepPayload) -> Self {
    WorkflowAction::UpdateStepData {
      step_id: step_id.into(),
      data,
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      WorkflowAction::GoToStep { .. } => "GO_TO_STEP",
      WorkflowAction::GoToNextStep => "GO_TO_NEXT_STEP",
      WorkflowAction::GoToPreviousStep => "GO_TO_PREVIOUS_STEP",
      WorkflowAction::CompleteStep { .. } => "COMPLETE_STEP",
      WorkflowAction::UpdateStepData { .. } => "UPDATE_STEP_DATA",
      WorkflowAction::Unknown => "UNKNOWN",
    }
  }
}
