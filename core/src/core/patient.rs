// carepath/src/core/patient.rs

//! The patient resource and visit a workflow session runs against.

use crate::core::path;
use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A patient resource as returned by the clinical data server. Kept as raw JSON
/// because visibility conditions address arbitrary fields by dot-path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
  pub uuid: String,
  pub resource: Value,
}

impl Patient {
  pub fn new(uuid: impl Into<String>, resource: Value) -> Self {
    Self {
      uuid: uuid.into(),
      resource,
    }
  }

  /// Builds a patient from a FHIR-style resource, taking the uuid from `id`
  /// (or `uuid` for REST representations).
  pub fn from_resource(resource: Value) -> Option<Self> {
    let uuid = resource
      .get("id")
      .or_else(|| resource.get("uuid"))
      .and_then(Value::as_str)?
      .to_string();
    Some(Self { uuid, resource })
  }

  /// Raw dot-path lookup on the resource.
  pub fn field(&self, field_path: &str) -> Option<&Value> {
    path::lookup(&self.resource, field_path)
  }

  /// Field lookup used by visibility conditions. `age` falls back to the value
  /// computed from `birthDate` on `reference_date`.
  pub fn condition_field(&self, field_path: &str, reference_date: NaiveDate) -> Option<Value> {
    match self.field(field_path) {
      Some(value) => Some(value.clone()),
      None if field_path == "age" => self.age_on(reference_date).map(Value::from),
      None => None,
    }
  }

  pub fn birth_date(&self) -> Option<NaiveDate> {
    self.field("birthDate").and_then(Value::as_str).and_then(parse_birth_date)
  }

  /// Age in completed years on `date`. `None` without a usable birth date or
  /// when the birth date lies after `date`.
  pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
    let birth = self.birth_date()?;
    if birth > date {
      return None;
    }
    let mut years = date.year() - birth.year();
    if (date.month(), date.day()) < (birth.month(), birth.day()) {
      years -= 1;
    }
    u32::try_from(years).ok()
  }
}

/// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD` and RFC 3339 datetimes. Partial
/// dates resolve to the first day of the period.
fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.date_naive());
  }
  if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
    return Some(date);
  }
  // Non-ASCII input may not split at byte 10.
  if let Some(prefix) = raw.get(..10).filter(|_| raw.len() > 10) {
    if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
      return Some(date);
    }
  }
  let mut parts = raw.splitn(3, '-');
  let year = parts.next()?.parse::<i32>().ok()?;
  let month = match parts.next() {
    Some(m) => m.parse::<u32>().ok()?,
    None => 1,
  };
  NaiveDate::from_ymd_opt(year, month, 1)
}

/// The visit the consultation is recorded against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
  pub uuid: String,
  /// True when the visit was created offline and has not been synced yet.
  #[serde(default)]
  pub offline: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub visit_type: Option<String>,
}

impl Visit {
  pub fn active(uuid: impl Into<String>) -> Self {
    Self {
      uuid: uuid.into(),
      offline: false,
      visit_type: None,
    }
  }

  pub fn offline(uuid: impl Into<String>) -> Self {
    Self {
      uuid: uuid.into(),
      offline: true,
      visit_type: None,
    }
  }
}
