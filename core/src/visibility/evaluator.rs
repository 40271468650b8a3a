// carepath/src/visibility/evaluator.rs

//! Decides which configured steps take part in the current workflow run.

use crate::core::patient::Patient;
use crate::core::payload::StepPayload;
use crate::definition::condition::{ConditionSource, LogicalOperator, StepCondition};
use crate::definition::step::WorkflowStep;
use crate::definition::workflow::WorkflowConfig;
use crate::visibility::operators;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{event, Level};

/// Everything a visibility rule may read.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityContext<'a> {
  pub patient: &'a Patient,
  pub steps_data: &'a HashMap<String, StepPayload>,
  /// Date patient ages are computed on.
  pub reference_date: NaiveDate,
}

impl<'a> VisibilityContext<'a> {
  pub fn new(
    patient: &'a Patient,
    steps_data: &'a HashMap<String, StepPayload>,
    reference_date: NaiveDate,
  ) -> Self {
    Self {
      patient,
      steps_data,
      reference_date,
    }
  }
}

/// Evaluates a single condition.
///
/// A step-sourced condition whose step has captured no data yet is unmet,
/// whatever its operator.
pub fn evaluate_condition(condition: &StepCondition, ctx: &VisibilityContext<'_>) -> bool {
  match condition.source {
    ConditionSource::Patient => {
      let actual = ctx.patient.condition_field(&condition.field, ctx.reference_date);
      operators::apply(&condition.operator, actual.as_ref(), &condition.value)
    }
    ConditionSource::Step => {
      let Some(payload) = condition.step_id.as_deref().and_then(|id| ctx.steps_data.get(id)) else {
        return false;
      };
      let actual = payload.lookup(&condition.field);
      operators::apply(&condition.operator, actual.as_ref(), &condition.value)
    }
  }
}

/// Whether `step` is shown. Conditions are grouped by source; all conditions of
/// a group must hold (an empty group holds vacuously) and the two group results
/// are combined with the step's logical operator.
pub fn is_step_visible(step: &WorkflowStep, ctx: &VisibilityContext<'_>) -> bool {
  let Some(visibility) = &step.visibility else {
    return true;
  };

  let (patient_conditions, step_conditions): (Vec<&StepCondition>, Vec<&StepCondition>) = visibility
    .conditions
    .iter()
    .partition(|c| c.source == ConditionSource::Patient);

  let patient_ok = patient_conditions.iter().all(|c| evaluate_condition(c, ctx));
  let steps_ok = step_conditions.iter().all(|c| evaluate_condition(c, ctx));

  let visible = match visibility.logical_operator {
    LogicalOperator::And => patient_ok && steps_ok,
    LogicalOperator::Or => patient_ok || steps_ok,
  };
  event!(
    Level::TRACE,
    step_id = %step.id,
    patient_ok,
    steps_ok,
    visible,
    "Step visibility evaluated."
  );
  visible
}

/// Ordered subset of the configured steps that are currently visible.
pub fn visible_steps(config: &WorkflowConfig, ctx: &VisibilityContext<'_>) -> Vec<WorkflowStep> {
  config
    .steps
    .iter()
    .filter(|step| is_step_visible(step, ctx))
    .cloned()
    .collect()
}
