// carepath/src/definition/step.rs

//! Defines a single step of a consultation workflow and the render-type tag
//! that selects its handler.

use crate::definition::condition::StepVisibility;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag selecting the handler (and payload shape) for a step.
///
/// Unknown tags are kept verbatim in `Custom` so configurations written for newer
/// hosts still load; they only fail when a session needs a handler for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RenderType {
  Form,
  Conditions,
  Medications,
  Allergies,
  Appointments,
  FormWorkspace,
  RegimenDrugOrder,
  Custom(String),
}

impl RenderType {
  pub fn as_str(&self) -> &str {
    match self {
      RenderType::Form => "form",
      RenderType::Conditions => "conditions",
      RenderType::Medications => "medications",
      RenderType::Allergies => "allergies",
      RenderType::Appointments => "appointments",
      RenderType::FormWorkspace => "form-workspace",
      RenderType::RegimenDrugOrder => "regimen-drug-order",
      RenderType::Custom(tag) => tag.as_str(),
    }
  }

  /// All render types with a built-in handler.
  pub fn known() -> [RenderType; 7] {
    [
      RenderType::Form,
      RenderType::Conditions,
      RenderType::Medications,
      RenderType::Allergies,
      RenderType::Appointments,
      RenderType::FormWorkspace,
      RenderType::RegimenDrugOrder,
    ]
  }
}

impl From<String> for RenderType {
  fn from(tag: String) -> Self {
    match tag.as_str() {
      "form" => RenderType::Form,
      "conditions" => RenderType::Conditions,
      "medications" => RenderType::Medications,
      "allergies" => RenderType::Allergies,
      "appointments" => RenderType::Appointments,
      "form-workspace" => RenderType::FormWorkspace,
      "regimen-drug-order" => RenderType::RegimenDrugOrder,
      _ => RenderType::Custom(tag),
    }
  }
}

impl From<&str> for RenderType {
  fn from(tag: &str) -> Self {
    RenderType::from(tag.to_string())
  }
}

impl From<RenderType> for String {
  fn from(render_type: RenderType) -> Self {
    match render_type {
      RenderType::Custom(tag) => tag,
      other => other.as_str().to_string(),
    }
  }
}

impl fmt::Display for RenderType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

fn default_weight() -> f64 {
  1.0
}

fn is_default_weight(weight: &f64) -> bool {
  *weight == 1.0
}

/// Definition of one wizard step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
  pub id: String,
  pub render_type: RenderType,
  #[serde(default)]
  pub title: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub form_id: Option<String>,
  /// Relative contribution to progress.
  #[serde(default = "default_weight", skip_serializing_if = "is_default_weight")]
  pub weight: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub visibility: Option<StepVisibility>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub initially_open: Option<bool>,
}

impl WorkflowStep {
  pub fn new(id: impl Into<String>, render_type: RenderType) -> Self {
    Self {
      id: id.into(),
      render_type,
      title: String::new(),
      form_id: None,
      weight: default_weight(),
      visibility: None,
      initially_open: None,
    }
  }

  pub fn with_title(mut self, title: impl Into<String>) -> Self {
    self.title = title.into();
    self
  }

  pub fn with_form(mut self, form_id: impl Into<String>) -> Self {
    self.form_id = Some(form_id.into());
    self
  }

  pub fn with_weight(mut self, weight: f64) -> Self {
    self.weight = weight;
    self
  }

  pub fn with_visibility(mut self, visibility: StepVisibility) -> Self {
    self.visibility = Some(visibility);
    self
  }

  pub fn initially_open(mut self, open: bool) -> Self {
    self.initially_open = Some(open);
    self
  }
}
