// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use carepath::api::{OrderContext, PatientSyncRequest, ProgramEnrollment, SubmittedOrder, WorkflowSubmission};
use carepath::{
  ApiErrorKind, ClinicalApi, ConditionOperator, DrugOrder, FormPayload, Observation, Patient, RenderType, StepCondition,
  StepPayload, StepVisibility, WorkflowConfig, WorkflowConfigRecord, WorkflowError, WorkflowResult, WorkflowStep,
};
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use tracing::Level;

// --- Fixtures ---

pub fn reference_date() -> NaiveDate {
  NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

pub fn patient(gender: &str, birth_date: &str) -> Patient {
  Patient::new(
    "patient-1",
    json!({
      "id": "patient-1",
      "gender": gender,
      "birthDate": birth_date,
      "address": [{"country": "Mozambique"}]
    }),
  )
}

pub fn male_patient() -> Patient {
  patient("male", "1990-03-15")
}

pub fn female_patient() -> Patient {
  patient("female", "1990-03-15")
}

/// A form payload recording `field = value`.
pub fn form_with(field: &str, value: Value) -> StepPayload {
  StepPayload::Form(FormPayload {
    encounter_uuid: Some("enc-form".into()),
    obs: vec![Observation::for_field(field, value)],
  })
}

/// `[A(form, w=1), B(medications, w=2, visible if A.gender == female), C(form, w=1)]`
pub fn abc_config() -> WorkflowConfig {
  let steps = vec![
    WorkflowStep::new("A", RenderType::Form).with_title("Intake").with_form("intake-form"),
    WorkflowStep::new("B", RenderType::Medications)
      .with_title("Medications")
      .with_weight(2.0)
      .with_visibility(StepVisibility::all(vec![StepCondition::step(
        "A",
        "gender",
        ConditionOperator::Equals,
        json!("female"),
      )])),
    WorkflowStep::new("C", RenderType::Form).with_title("Plan").with_form("plan-form"),
  ];
  WorkflowConfig::new("wf-abc", "Antenatal consultation", steps).unwrap_or_else(|e| panic!("fixture config: {}", e))
}

/// `[intake(form), meds(medications), allergies(allergies)]`, all unconditional.
pub fn medication_config() -> WorkflowConfig {
  let steps = vec![
    WorkflowStep::new("intake", RenderType::Form).with_title("Intake"),
    WorkflowStep::new("meds", RenderType::Medications).with_title("Medications"),
    WorkflowStep::new("allergies", RenderType::Allergies).with_title("Allergies"),
  ];
  WorkflowConfig::new("wf-meds", "General consultation", steps).unwrap_or_else(|e| panic!("fixture config: {}", e))
}

pub fn complete_order(drug: &str) -> DrugOrder {
  DrugOrder {
    drug: Some(drug.into()),
    dose: Some(1.0),
    dose_units: Some("tablet".into()),
    route: Some("oral".into()),
    frequency: Some("once-daily".into()),
    ..Default::default()
  }
}

pub fn record_for(config: &WorkflowConfig) -> WorkflowConfigRecord {
  WorkflowConfigRecord {
    uuid: config.uuid.clone(),
    name: config.name.clone(),
    description: String::new(),
    version: "1".into(),
    clobdata: Some(json!({ "steps": config.steps }).to_string()),
  }
}

// --- In-memory ClinicalApi ---

/// Records every call and answers from scripted data.
#[derive(Default)]
pub struct MockClinicalApi {
  pub configs: Mutex<HashMap<String, WorkflowConfigRecord>>,
  /// Errors returned by the next `submit_drug_order` calls, in order. `None`
  /// entries let that call succeed.
  pub order_failures: Mutex<VecDeque<Option<WorkflowError>>>,
  pub submitted_orders: Mutex<Vec<(DrugOrder, OrderContext)>>,
  /// Order uuids the encounter reports; `None` reports every submitted order.
  pub encounter_orders: Mutex<Option<Vec<String>>>,
  pub saved: Mutex<Vec<WorkflowSubmission>>,
  pub save_failure: Mutex<Option<WorkflowError>>,
  pub enrollments: Mutex<Vec<ProgramEnrollment>>,
  pub sync_requests: Mutex<Vec<PatientSyncRequest>>,
  pub sync_failure: Mutex<Option<WorkflowError>>,
}

impl MockClinicalApi {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_config(self, config: &WorkflowConfig) -> Self {
    self.configs.lock().insert(config.uuid.clone(), record_for(config));
    self
  }

  pub fn fail_next_order(&self, error: WorkflowError) {
    self.order_failures.lock().push_back(Some(error));
  }

  pub fn succeed_next_order(&self) {
    self.order_failures.lock().push_back(None);
  }

  pub fn submitted_count(&self) -> usize {
    self.submitted_orders.lock().len()
  }
}

#[async_trait]
impl ClinicalApi for MockClinicalApi {
  async fn fetch_workflow_config(&self, workflow_uuid: &str) -> WorkflowResult<WorkflowConfigRecord> {
    self
      .configs
      .lock()
      .get(workflow_uuid)
      .cloned()
      .ok_or_else(|| WorkflowError::api(ApiErrorKind::Api, format!("Object with given uuid doesn't exist: {}", workflow_uuid)))
  }

  async fn submit_drug_order(&self, order: &DrugOrder, ctx: &OrderContext) -> WorkflowResult<SubmittedOrder> {
    if let Some(Some(err)) = self.order_failures.lock().pop_front() {
      return Err(err);
    }
    let mut submitted = self.submitted_orders.lock();
    submitted.push((order.clone(), ctx.clone()));
    Ok(SubmittedOrder {
      uuid: format!("order-{}", submitted.len()),
      encounter_uuid: ctx.encounter_uuid.clone().or_else(|| Some("enc-meds".to_string())),
    })
  }

  async fn fetch_encounter_order_uuids(&self, _encounter_uuid: &str) -> WorkflowResult<Vec<String>> {
    if let Some(scripted) = self.encounter_orders.lock().clone() {
      return Ok(scripted);
    }
    Ok((1..=self.submitted_orders.lock().len()).map(|i| format!("order-{}", i)).collect())
  }

  async fn save_workflow_data(&self, submission: &WorkflowSubmission) -> WorkflowResult<Option<String>> {
    if let Some(err) = self.save_failure.lock().take() {
      return Err(err);
    }
    self.saved.lock().push(submission.clone());
    Ok(Some("submission-1".into()))
  }

  async fn fetch_program_enrollments(&self, _patient_uuid: &str) -> WorkflowResult<Vec<ProgramEnrollment>> {
    Ok(self.enrollments.lock().clone())
  }

  async fn sync_patient(&self, request: &PatientSyncRequest) -> WorkflowResult<()> {
    if let Some(err) = self.sync_failure.lock().take() {
      return Err(err);
    }
    self.sync_requests.lock().push(request.clone());
    Ok(())
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
