// carepath/src/core/payload.rs

//! Typed data captured by each kind of step.
//!
//! `StepPayload` is keyed by render type so each step's completion payload has
//! a known shape. Entry types keep unrecognised fields in `extra` so nothing a
//! host sends is dropped on the way to the persistence endpoint.

use crate::core::path;
use crate::definition::step::RenderType;
use crate::error::{WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix the form engine puts in front of a field's id in `formFieldPath`.
pub const FORM_FIELD_PATH_PREFIX: &str = "rfe-forms-";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uuid: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub concept: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub form_field_path: Option<String>,
  #[serde(default)]
  pub value: Value,
}

impl Observation {
  pub fn for_field(field: &str, value: Value) -> Self {
    Self {
      form_field_path: Some(format!("{}{}", FORM_FIELD_PATH_PREFIX, field)),
      value,
      ..Default::default()
    }
  }

  /// The observation's value with coded answers (`{name, uuid}`) unwrapped to the uuid.
  pub fn plain_value(&self) -> Value {
    match &self.value {
      Value::Object(map) => match map.get("uuid") {
        Some(uuid @ Value::String(_)) => uuid.clone(),
        _ => self.value.clone(),
      },
      other => other.clone(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPayload {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub encounter_uuid: Option<String>,
  #[serde(default)]
  pub obs: Vec<Observation>,
}

impl FormPayload {
  /// Value of the observation recorded for form field `field`.
  pub fn field_value(&self, field: &str) -> Option<Value> {
    let wanted = format!("{}{}", FORM_FIELD_PATH_PREFIX, field);
    self
      .obs
      .iter()
      .find(|o| o.form_field_path.as_deref() == Some(wanted.as_str()))
      .map(Observation::plain_value)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionEntry {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uuid: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub concept: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub display: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub clinical_status: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub onset_date: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergyEntry {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uuid: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub allergen: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub severity: Option<String>,
  #[serde(default)]
  pub reactions: Vec<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentEntry {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uuid: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub service: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start_date_time: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// A drug order as buffered in the medication basket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugOrder {
  /// Set once the server has accepted the order.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uuid: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub drug: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dose: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dose_units: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub route: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub frequency: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration_units: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quantity: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quantity_units: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl DrugOrder {
  pub fn is_saved(&self) -> bool {
    self.uuid.as_deref().map_or(false, |u| !u.is_empty())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationPayload {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub encounter_uuid: Option<String>,
  #[serde(default)]
  pub orders: Vec<DrugOrder>,
}

/// Data captured by a step, one variant per render type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum StepPayload {
  Form(FormPayload),
  Conditions(Vec<ConditionEntry>),
  Medications(MedicationPayload),
  Allergies(Vec<AllergyEntry>),
  Appointments(Vec<AppointmentEntry>),
  FormWorkspace(Value),
  RegimenDrugOrder(Value),
  Custom(Value),
}

impl StepPayload {
  /// Empty payload of the variant belonging to `render_type`.
  pub fn empty_for(render_type: &RenderType) -> Self {
    match render_type {
      RenderType::Form => StepPayload::Form(FormPayload::default()),
      RenderType::Conditions => StepPayload::Conditions(Vec::new()),
      RenderType::Medications => StepPayload::Medications(MedicationPayload::default()),
      RenderType::Allergies => StepPayload::Allergies(Vec::new()),
      RenderType::Appointments => StepPayload::Appointments(Vec::new()),
      RenderType::FormWorkspace => StepPayload::FormWorkspace(Value::Null),
      RenderType::RegimenDrugOrder => StepPayload::RegimenDrugOrder(Value::Null),
      RenderType::Custom(_) => StepPayload::Custom(Value::Null),
    }
  }

  /// Parses raw JSON emitted by a step into the variant for `render_type`.
  pub fn from_value(render_type: &RenderType, value: Value) -> WorkflowResult<Self> {
    let parse_err = |source| WorkflowError::InvalidPayload {
      render_type: render_type.to_string(),
      source,
    };
    Ok(match render_type {
      RenderType::Form => StepPayload::Form(serde_json::from_value(value).map_err(parse_err)?),
      RenderType::Conditions => StepPayload::Conditions(serde_json::from_value(value).map_err(parse_err)?),
      RenderType::Medications => StepPayload::Medications(serde_json::from_value(value).map_err(parse_err)?),
      RenderType::Allergies => StepPayload::Allergies(serde_json::from_value(value).map_err(parse_err)?),
      RenderType::Appointments => StepPayload::Appointments(serde_json::from_value(value).map_err(parse_err)?),
      RenderType::FormWorkspace => StepPayload::FormWorkspace(value),
      RenderType::RegimenDrugOrder => StepPayload::RegimenDrugOrder(value),
      RenderType::Custom(_) => StepPayload::Custom(value),
    })
  }

  /// Whether this payload is the variant a step of `render_type` produces.
  pub fn matches(&self, render_type: &RenderType) -> bool {
    matches!(
      (self, render_type),
      (StepPayload::Form(_), RenderType::Form)
        | (StepPayload::Conditions(_), RenderType::Conditions)
        | (StepPayload::Medications(_), RenderType::Medications)
        | (StepPayload::Allergies(_), RenderType::Allergies)
        | (StepPayload::Appointments(_), RenderType::Appointments)
        | (StepPayload::FormWorkspace(_), RenderType::FormWorkspace)
        | (StepPayload::RegimenDrugOrder(_), RenderType::RegimenDrugOrder)
        | (StepPayload::Custom(_), RenderType::Custom(_))
    )
  }

  /// The payload's data as plain JSON, without the variant tag.
  pub fn to_value(&self) -> Value {
    let converted = match self {
      StepPayload::Form(p) => serde_json::to_value(p),
      StepPayload::Conditions(p) => serde_json::to_value(p),
      StepPayload::Medications(p) => serde_json::to_value(p),
      StepPayload::Allergies(p) => serde_json::to_value(p),
      StepPayload::Appointments(p) => serde_json::to_value(p),
      StepPayload::FormWorkspace(v) | StepPayload::RegimenDrugOrder(v) | StepPayload::Custom(v) => Ok(v.clone()),
    };
    // Derived Serialize on these types has no fallible paths.
    converted.unwrap_or(Value::Null)
  }

  /// Looks up `field` the way visibility conditions see it: form payloads by
  /// form field id, everything else by dot-path over the payload's JSON.
  pub fn lookup(&self, field: &str) -> Option<Value> {
    match self {
      StepPayload::Form(form) => form.field_value(field),
      other => {
        let value = other.to_value();
        path::lookup(&value, field).cloned()
      }
    }
  }
}
