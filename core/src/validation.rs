// carepath/src/validation.rs

//! Per-field validation errors collected while checking a step's buffered data.

use std::collections::BTreeMap;
use std::fmt;

/// Field-keyed validation messages. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
  fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.fields.entry(field.into()).or_default().push(message.into());
  }

  /// Records `message` for `field` when `value` is missing or blank.
  pub fn require(&mut self, field: &str, value: Option<&str>, message: &str) {
    if value.map_or(true, |v| v.trim().is_empty()) {
      self.add(field, message);
    }
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  pub fn len(&self) -> usize {
    self.fields.values().map(Vec::len).sum()
  }

  pub fn field(&self, field: &str) -> &[String] {
    self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
    self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
  }

  pub fn merge(&mut self, other: ValidationErrors) {
    for (field, messages) in other.fields {
      self.fields.entry(field).or_default().extend(messages);
    }
  }

  /// `Ok(())` when nothing was collected, the errors otherwise.
  pub fn into_result(self) -> Result<(), ValidationErrors> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(self)
    }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, messages) in &self.fields {
      for message in messages {
        if !first {
          f.write_str("; ")?;
        }
        write!(f, "{}: {}", field, message)?;
        first = false;
      }
    }
    Ok(())
  }
}

impl std::error::Error for ValidationErrors {}
