// carepath/src/definition/workflow.rs

//! Contains the `WorkflowConfig` struct, its construction from the persisted
//! "clob" record, and structural validation.

use crate::definition::condition::ConditionSource;
use crate::definition::step::WorkflowStep;
use crate::error::{WorkflowError, WorkflowResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{event, instrument, Level};

/// Accepts `"1.0"` as well as `1` for version fields; hosts have stored both.
fn deserialize_version<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    None | Some(Value::Null) => String::new(),
    Some(Value::String(s)) => s,
    Some(other) => other.to_string(),
  })
}

fn deserialize_opt_version<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let version = deserialize_version(deserializer)?;
  Ok(if version.is_empty() { None } else { Some(version) })
}

/// The workflow configuration record as stored by the consultation-workflow
/// endpoint. The step definitions live in `clobdata` as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfigRecord {
  pub uuid: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default, deserialize_with = "deserialize_version")]
  pub version: String,
  #[serde(default)]
  pub clobdata: Option<String>,
}

/// Shape of the clob itself. Any header field it omits comes from the record.
#[derive(Debug, Deserialize)]
struct ClobDocument {
  #[serde(default)]
  uuid: Option<String>,
  #[serde(default)]
  name: Option<String>,
  #[serde(default)]
  description: Option<String>,
  #[serde(default, deserialize_with = "deserialize_opt_version")]
  version: Option<String>,
  #[serde(default)]
  steps: Vec<WorkflowStep>,
}

/// Immutable definition of a consultation workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
  pub uuid: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default, deserialize_with = "deserialize_version")]
  pub version: String,
  #[serde(default)]
  pub steps: Vec<WorkflowStep>,
}

impl WorkflowConfig {
  /// Builds and validates a configuration from already-parsed steps.
  pub fn new(
    uuid: impl Into<String>,
    name: impl Into<String>,
    steps: Vec<WorkflowStep>,
  ) -> WorkflowResult<Self> {
    let config = Self {
      uuid: uuid.into(),
      name: name.into(),
      description: String::new(),
      version: String::new(),
      steps,
    };
    config.validate()?;
    Ok(config)
  }

  /// Parses a full configuration document.
  pub fn from_json(json: &str) -> WorkflowResult<Self> {
    let config: WorkflowConfig =
      serde_json::from_str(json).map_err(|source| WorkflowError::ConfigParse { source })?;
    config.validate()?;
    Ok(config)
  }

  /// Resolves the configuration stored in a workflow record's clob.
  ///
  /// A record without clob data yields `WorkflowError::MissingClobData`, which
  /// hosts render as the dedicated workflow-error screen.
  #[instrument(name = "WorkflowConfig::from_record", skip_all, fields(workflow_uuid = %record.uuid), err(Display))]
  pub fn from_record(record: WorkflowConfigRecord) -> WorkflowResult<Self> {
    let clob = match record.clobdata.as_deref().map(str::trim) {
      Some(clob) if !clob.is_empty() => clob.to_string(),
      _ => {
        event!(Level::WARN, "Workflow record carries no clob data.");
        return Err(WorkflowError::MissingClobData {
          workflow_uuid: record.uuid,
        });
      }
    };

    let doc: ClobDocument =
      serde_json::from_str(&clob).map_err(|source| WorkflowError::ConfigParse { source })?;

    let config = WorkflowConfig {
      uuid: doc.uuid.unwrap_or(record.uuid),
      name: doc.name.unwrap_or(record.name),
      description: doc.description.unwrap_or(record.description),
      version: doc.version.unwrap_or(record.version),
      steps: doc.steps,
    };
    config.validate()?;
    event!(Level::DEBUG, num_steps = config.steps.len(), "Workflow configuration resolved.");
    Ok(config)
  }

  /// Checks structural rules: unique, non-empty step ids; finite non-negative
  /// weights; step-sourced conditions pointing at configured steps.
  pub fn validate(&self) -> WorkflowResult<()> {
    let mut seen = HashSet::new();
    for step in &self.steps {
      if step.id.trim().is_empty() {
        return Err(WorkflowError::InvalidConfig {
          message: "step id must not be empty".to_string(),
        });
      }
      if !seen.insert(step.id.as_str()) {
        return Err(WorkflowError::InvalidConfig {
          message: format!("duplicate step id '{}'", step.id),
        });
      }
      if !step.weight.is_finite() || step.weight < 0.0 {
        return Err(WorkflowError::InvalidConfig {
          message: format!("step '{}' has invalid weight {}", step.id, step.weight),
        });
      }
    }

    for step in &self.steps {
      let Some(visibility) = &step.visibility else { continue };
      for condition in &visibility.conditions {
        if condition.source != ConditionSource::Step {
          continue;
        }
        // Unresolvable step conditions are never met.
        match condition.step_id.as_deref() {
          Some(target) if seen.contains(target) => {}
          Some(target) => {
            event!(Level::WARN, step_id = %step.id, %target, "Step condition refers to an unknown step; it will never be met.");
          }
          None => {
            event!(Level::WARN, step_id = %step.id, "Step condition has no stepId; it will never be met.");
          }
        }
      }
    }
    Ok(())
  }

  pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
    self.steps.iter().find(|s| s.id == step_id)
  }

  pub fn contains_step(&self, step_id: &str) -> bool {
    self.steps.iter().any(|s| s.id == step_id)
  }

  /// Sum of all configured step weights, visible or not.
  pub fn total_weight(&self) -> f64 {
    self.steps.iter().map(|s| s.weight).sum()
  }
}
