// carepath/src/api/sync.rs

//! Patient sync: translates the patient's program enrollments into the code
//! tables of the external interoperability system.

use crate::error::{WorkflowError, WorkflowResult};
use crate::validation::ValidationErrors;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{event, Level};

/// A program enrollment as read from the clinical data server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramEnrollment {
  pub program_uuid: String,
  /// Current (open) state of the enrollment, if any.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state_uuid: Option<String>,
}

/// Fixed lookup tables from local uuids to external codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSyncMappings {
  /// Program uuid to clinical-service code.
  #[serde(default)]
  pub clinical_services: HashMap<String, String>,
  /// Program-state uuid to state code.
  #[serde(default)]
  pub program_states: HashMap<String, String>,
}

impl PatientSyncMappings {
  pub fn from_file(path: &Path) -> WorkflowResult<Self> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
      WorkflowError::Configuration(format!("Cannot read patient sync mappings '{}': {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
      WorkflowError::Configuration(format!("Invalid patient sync mappings '{}': {}", path.display(), e))
    })
  }

  /// Maps the enrollments of programs that have a clinical-service code.
  /// Enrollments of unmapped programs are skipped; a mapped program whose
  /// current state has no code is a validation error.
  pub fn map_enrollments(&self, enrollments: &[ProgramEnrollment]) -> WorkflowResult<Vec<SyncedEnrollment>> {
    let mut errors = ValidationErrors::new();
    let mut mapped = Vec::new();

    for enrollment in enrollments {
      let Some(service) = self.clinical_services.get(&enrollment.program_uuid) else {
        event!(Level::DEBUG, program_uuid = %enrollment.program_uuid, "Program has no clinical-service code, not synced.");
        continue;
      };
      let state = match &enrollment.state_uuid {
        None => None,
        Some(state_uuid) => match self.program_states.get(state_uuid) {
          Some(code) => Some(code.clone()),
          None => {
            errors.add(
              format!("programState.{}", state_uuid),
              format!("No state code mapped for program {}", enrollment.program_uuid),
            );
            continue;
          }
        },
      };
      mapped.push(SyncedEnrollment {
        clinical_service: service.clone(),
        program_state: state,
      });
    }

    errors.into_result()?;
    Ok(mapped)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedEnrollment {
  pub clinical_service: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub program_state: Option<String>,
}

/// Body posted to the external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSyncRequest {
  pub patient_uuid: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub visit_uuid: Option<String>,
  pub enrollments: Vec<SyncedEnrollment>,
}
