// carepath/examples/consultation_walkthrough.rs

use async_trait::async_trait;
use carepath::api::{OrderContext, PatientSyncRequest, ProgramEnrollment, SubmittedOrder, WorkflowSubmission};
use carepath::{
  ClinicalApi, DrugOrder, FormPayload, MedicationPayload, NextOutcome, Observation, Patient, Settings, StepPayload,
  StepRegistry, Visit, WorkflowConfigRecord, WorkflowError, WorkflowResult, WorkflowSession,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use url::Url;

// 1. A workflow as the persistence endpoint stores it: the steps live in the clob.
const CLOB: &str = r#"{
  "steps": [
    {"id": "intake", "renderType": "form", "title": "Intake", "formId": "adult-intake"},
    {
      "id": "anc", "renderType": "form", "title": "Antenatal care", "weight": 2,
      "visibility": {
        "logicalOperator": "AND",
        "conditions": [
          {"source": "patient", "field": "gender", "operator": "equals", "value": "F"},
          {"source": "step", "stepId": "intake", "field": "pregnant", "operator": "equals", "value": "yes"}
        ]
      }
    },
    {"id": "meds", "renderType": "medications", "title": "Prescriptions"},
    {"id": "allergies", "renderType": "allergies", "title": "Allergies"}
  ]
}"#;

// 2. An in-memory stand-in for the clinical data server.
#[derive(Default)]
struct DemoServer {
  orders: Mutex<Vec<String>>,
}

#[async_trait]
impl ClinicalApi for DemoServer {
  async fn fetch_workflow_config(&self, workflow_uuid: &str) -> WorkflowResult<WorkflowConfigRecord> {
    Ok(WorkflowConfigRecord {
      uuid: workflow_uuid.to_string(),
      name: "Adult consultation".into(),
      description: String::new(),
      version: "1".into(),
      clobdata: Some(CLOB.into()),
    })
  }

  async fn submit_drug_order(&self, order: &DrugOrder, _ctx: &OrderContext) -> WorkflowResult<SubmittedOrder> {
    let mut orders = self.orders.lock();
    let uuid = format!("order-{}", orders.len() + 1);
    info!(drug = ?order.drug, %uuid, "Server accepted drug order.");
    orders.push(uuid.clone());
    Ok(SubmittedOrder {
      uuid,
      encounter_uuid: Some("encounter-1".into()),
    })
  }

  async fn fetch_encounter_order_uuids(&self, _encounter_uuid: &str) -> WorkflowResult<Vec<String>> {
    Ok(self.orders.lock().clone())
  }

  async fn save_workflow_data(&self, submission: &WorkflowSubmission) -> WorkflowResult<Option<String>> {
    let body = serde_json::to_string_pretty(submission).map_err(|e| WorkflowError::Internal(e.to_string()))?;
    info!("Server stored workflow data:\n{}", body);
    Ok(Some("workflow-data-1".into()))
  }

  async fn fetch_program_enrollments(&self, _patient_uuid: &str) -> WorkflowResult<Vec<ProgramEnrollment>> {
    Ok(Vec::new())
  }

  async fn sync_patient(&self, _request: &PatientSyncRequest) -> WorkflowResult<()> {
    Ok(())
  }
}

#[tokio::main]
async fn main() -> Result<(), WorkflowError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Consultation Walkthrough ---");

  let settings = Settings::new(Url::parse("http://localhost:8080/openmrs").map_err(|e| WorkflowError::Configuration(e.to_string()))?);
  let registry = Arc::new(StepRegistry::with_defaults());
  let patient = Patient::new("patient-42", json!({"gender": "F", "birthDate": "1995-02-11"}));

  // 3. Open the session. "anc" stays hidden until intake records a pregnancy.
  let session = WorkflowSession::open(
    "adult-consultation",
    patient,
    Some(Visit::active("visit-7")),
    registry,
    Arc::new(DemoServer::default()),
    &settings,
  )
  .await?;
  info!(visible = ?session.snapshot().visible_step_ids(), "Session opened.");

  // 4. The form engine submits the intake form.
  let intake = StepPayload::Form(FormPayload {
    encounter_uuid: Some("encounter-1".into()),
    obs: vec![Observation::for_field("pregnant", json!({"uuid": "yes", "display": "Yes"}))],
  });
  session.complete_step("intake", intake)?;
  let state = session.snapshot();
  info!(visible = ?state.visible_step_ids(), current = ?state.current_step().map(|s| &s.id), progress = state.progress(), "Intake done.");

  session.complete_step("anc", StepPayload::Form(FormPayload::default()))?;

  // 5. The medication basket is edited live, then flushed on "next".
  let mut order = DrugOrder {
    drug: Some("ferrous-sulfate".into()),
    dose: Some(200.0),
    dose_units: Some("mg".into()),
    route: Some("oral".into()),
    ..Default::default()
  };
  session.update_step_data(
    "meds",
    StepPayload::Medications(MedicationPayload {
      encounter_uuid: None,
      orders: vec![order.clone()],
    }),
  )?;
  if let NextOutcome::Blocked(block) = session.next().await? {
    info!(warning = %block.warning, errors = %block.errors, "Medications blocked.");
  }

  order.frequency = Some("once-daily".into());
  session.update_step_data(
    "meds",
    StepPayload::Medications(MedicationPayload {
      encounter_uuid: None,
      orders: vec![order],
    }),
  )?;
  let outcome = session.next().await?;
  info!(?outcome, "Medications flushed.");

  // 6. Allergies snapshot whatever was buffered (nothing here), then save.
  session.next().await?;
  let state = session.snapshot();
  info!(progress = state.progress(), last = state.is_last_step(), "All steps done.");

  let saved = session.save().await?;
  info!(?saved, "Workflow saved.");
  session.close();

  info!("--- Consultation Walkthrough Complete ---");
  Ok(())
}
