// carepath/src/api/mod.rs

//! The clinical data server as the engine sees it: the `ClinicalApi` trait, the
//! request/response bodies the engine produces or consumes, and a REST
//! implementation.

pub mod errors;
pub mod rest;
pub mod sync;

use crate::core::payload::DrugOrder;
use crate::definition::workflow::WorkflowConfigRecord;
use crate::error::WorkflowResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use errors::classify_api_error;
pub use rest::RestClinicalApi;
pub use sync::{PatientSyncMappings, PatientSyncRequest, ProgramEnrollment, SyncedEnrollment};

/// Who and where a drug order is placed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderContext {
  pub patient_uuid: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub encounter_uuid: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub visit_uuid: Option<String>,
}

/// The server's answer to a drug order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedOrder {
  pub uuid: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub encounter_uuid: Option<String>,
}

/// The accumulated step data submitted on the final save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSubmission {
  pub workflow_config: String,
  #[serde(default)]
  pub workflow_version: String,
  pub patient: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub visit: Option<String>,
  pub completed_steps: Vec<String>,
  /// Step id to that step's data, as plain JSON.
  pub steps_data: Map<String, Value>,
  pub submitted_at: DateTime<Utc>,
}

/// Remote operations the workflow engine depends on.
#[async_trait]
pub trait ClinicalApi: Send + Sync {
  /// Loads the persisted workflow configuration record.
  async fn fetch_workflow_config(&self, workflow_uuid: &str) -> WorkflowResult<WorkflowConfigRecord>;

  /// Places one drug order and returns the saved order's identifiers.
  async fn submit_drug_order(&self, order: &DrugOrder, ctx: &OrderContext) -> WorkflowResult<SubmittedOrder>;

  /// Uuids of the orders currently attached to an encounter.
  async fn fetch_encounter_order_uuids(&self, encounter_uuid: &str) -> WorkflowResult<Vec<String>>;

  /// Persists the final submission. Returns the stored record's uuid when the
  /// endpoint reports one.
  async fn save_workflow_data(&self, submission: &WorkflowSubmission) -> WorkflowResult<Option<String>>;

  /// The patient's active program enrollments with their current states.
  async fn fetch_program_enrollments(&self, patient_uuid: &str) -> WorkflowResult<Vec<ProgramEnrollment>>;

  /// Pushes the patient's program state to the external interoperability system.
  async fn sync_patient(&self, request: &PatientSyncRequest) -> WorkflowResult<()>;
}
