// carepath/src/definition/condition.rs

//! Conditional-display rules attached to a step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a condition reads its field from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionSource {
  Patient,
  Step,
}

/// Comparison applied between the looked-up field value and the condition value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
  Equals,
  Contains,
  Gt,
  Lt,
  Gte,
  Lte,
  In,
  Not,
  Exists,
  /// Any tag not listed above. Always evaluates to false.
  Unknown(String),
}

impl From<String> for ConditionOperator {
  fn from(tag: String) -> Self {
    match tag.as_str() {
      "equals" => ConditionOperator::Equals,
      "contains" => ConditionOperator::Contains,
      "gt" => ConditionOperator::Gt,
      "lt" => ConditionOperator::Lt,
      "gte" => ConditionOperator::Gte,
      "lte" => ConditionOperator::Lte,
      "in" => ConditionOperator::In,
      "not" => ConditionOperator::Not,
      "exists" => ConditionOperator::Exists,
      _ => ConditionOperator::Unknown(tag),
    }
  }
}

impl From<ConditionOperator> for String {
  fn from(op: ConditionOperator) -> Self {
    match op {
      ConditionOperator::Equals => "equals".into(),
      ConditionOperator::Contains => "contains".into(),
      ConditionOperator::Gt => "gt".into(),
      ConditionOperator::Lt => "lt".into(),
      ConditionOperator::Gte => "gte".into(),
      ConditionOperator::Lte => "lte".into(),
      ConditionOperator::In => "in".into(),
      ConditionOperator::Not => "not".into(),
      ConditionOperator::Exists => "exists".into(),
      ConditionOperator::Unknown(tag) => tag,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
  #[default]
  #[serde(rename = "AND", alias = "and")]
  And,
  #[serde(rename = "OR", alias = "or")]
  Or,
}

/// A single predicate over patient data or another step's captured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepCondition {
  pub source: ConditionSource,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub step_id: Option<String>,
  /// Dot-separated path into the source record.
  pub field: String,
  pub operator: ConditionOperator,
  #[serde(default)]
  pub value: Value,
}

impl StepCondition {
  pub fn patient(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
    Self {
      source: ConditionSource::Patient,
      step_id: None,
      field: field.into(),
      operator,
      value,
    }
  }

  pub fn step(
    step_id: impl Into<String>,
    field: impl Into<String>,
    operator: ConditionOperator,
    value: Value,
  ) -> Self {
    Self {
      source: ConditionSource::Step,
      step_id: Some(step_id.into()),
      field: field.into(),
      operator,
      value,
    }
  }
}

/// Rule set deciding whether a step is shown. A step without one is always visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepVisibility {
  #[serde(default)]
  pub conditions: Vec<StepCondition>,
  #[serde(default)]
  pub logical_operator: LogicalOperator,
}

impl StepVisibility {
  pub fn all(conditions: Vec<StepCondition>) -> Self {
    Self {
      conditions,
      logical_operator: LogicalOperator::And,
    }
  }

  pub fn any(conditions: Vec<StepCondition>) -> Self {
    Self {
      conditions,
      logical_operator: LogicalOperator::Or,
    }
  }
}
