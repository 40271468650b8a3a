// carepath/src/api/rest.rs

//! `ClinicalApi` over the clinical data server's REST interface.

use crate::api::errors::classify_api_error;
use crate::api::sync::{PatientSyncRequest, ProgramEnrollment};
use crate::api::{ClinicalApi, OrderContext, SubmittedOrder, WorkflowSubmission};
use crate::core::payload::DrugOrder;
use crate::definition::workflow::WorkflowConfigRecord;
use crate::error::{ApiErrorKind, WorkflowError, WorkflowResult};
use crate::settings::Settings;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{event, instrument, Level};
use url::Url;

const REST_ROOT: &[&str] = &["ws", "rest", "v1"];
const ENCOUNTER_ORDERS_VIEW: &str = "custom:(uuid,orders:(uuid))";
const ENROLLMENT_VIEW: &str = "custom:(uuid,program:(uuid),dateCompleted,states:(endDate,state:(uuid)))";

#[derive(Clone)]
pub struct RestClinicalApi {
  http: reqwest::Client,
  base_url: Url,
  patient_sync_url: Option<Url>,
}

impl RestClinicalApi {
  pub fn new(settings: &Settings) -> WorkflowResult<Self> {
    let http = reqwest::Client::builder()
      .timeout(settings.request_timeout)
      .build()
      .map_err(|e| WorkflowError::Configuration(format!("Cannot build HTTP client: {}", e)))?;
    Ok(Self {
      http,
      base_url: settings.base_url.clone(),
      patient_sync_url: settings.patient_sync.as_ref().map(|s| s.url.clone()),
    })
  }

  /// Uses a caller-supplied client, e.g. one carrying session cookies.
  pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
    Self {
      http,
      base_url,
      patient_sync_url: None,
    }
  }

  pub fn with_patient_sync_url(mut self, url: Url) -> Self {
    self.patient_sync_url = Some(url);
    self
  }

  /// `{base}/ws/rest/v1/{segments...}`
  fn endpoint(&self, segments: &[&str]) -> WorkflowResult<Url> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| WorkflowError::Configuration(format!("Base URL '{}' cannot be a base", self.base_url)))?
      .pop_if_empty()
      .extend(REST_ROOT.iter().chain(segments.iter()));
    Ok(url)
  }

  async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> WorkflowResult<T> {
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      let err = classify_api_error(status.as_u16(), &body);
      event!(Level::WARN, status = status.as_u16(), error = %err, "Clinical API request failed.");
      return Err(err);
    }
    resp
      .json::<T>()
      .await
      .map_err(|e| WorkflowError::api(ApiErrorKind::ServerCommunication, format!("Unreadable response body: {}", e)))
  }
}

fn drug_order_body(order: &DrugOrder, ctx: &OrderContext) -> Value {
  let mut body = Map::new();
  for (key, value) in &order.extra {
    body.insert(key.clone(), value.clone());
  }
  body.insert("type".into(), json!("drugorder"));
  body.entry("action").or_insert(json!("NEW"));
  body.insert("patient".into(), json!(ctx.patient_uuid));
  if let Some(encounter) = &ctx.encounter_uuid {
    body.insert("encounter".into(), json!(encounter));
  }
  let fields = [
    ("drug", order.drug.as_ref().map(|v| json!(v))),
    ("dose", order.dose.map(|v| json!(v))),
    ("doseUnits", order.dose_units.as_ref().map(|v| json!(v))),
    ("route", order.route.as_ref().map(|v| json!(v))),
    ("frequency", order.frequency.as_ref().map(|v| json!(v))),
    ("duration", order.duration.map(|v| json!(v))),
    ("durationUnits", order.duration_units.as_ref().map(|v| json!(v))),
    ("quantity", order.quantity.map(|v| json!(v))),
    ("quantityUnits", order.quantity_units.as_ref().map(|v| json!(v))),
  ];
  for (key, value) in fields {
    if let Some(value) = value {
      body.insert(key.into(), value);
    }
  }
  Value::Object(body)
}

/// Current state of an enrollment: the state entry without an end date.
fn current_state(enrollment: &Value) -> Option<String> {
  enrollment
    .get("states")?
    .as_array()?
    .iter()
    .find(|s| s.get("endDate").map_or(true, Value::is_null))
    .and_then(|s| s.get("state")?.get("uuid")?.as_str())
    .map(str::to_string)
}

#[async_trait]
impl ClinicalApi for RestClinicalApi {
  #[instrument(name = "RestClinicalApi::fetch_workflow_config", skip(self), err(Display))]
  async fn fetch_workflow_config(&self, workflow_uuid: &str) -> WorkflowResult<WorkflowConfigRecord> {
    let url = self.endpoint(&["consultationworkflow", "workflowconfig", workflow_uuid])?;
    let resp = self.http.get(url).send().await?;
    Self::read_json(resp).await
  }

  #[instrument(name = "RestClinicalApi::submit_drug_order", skip_all, fields(patient_uuid = %ctx.patient_uuid), err(Display))]
  async fn submit_drug_order(&self, order: &DrugOrder, ctx: &OrderContext) -> WorkflowResult<SubmittedOrder> {
    let url = self.endpoint(&["order"])?;
    let resp = self.http.post(url).json(&drug_order_body(order, ctx)).send().await?;
    let saved: Value = Self::read_json(resp).await?;
    let uuid = saved
      .get("uuid")
      .and_then(Value::as_str)
      .ok_or_else(|| WorkflowError::api(ApiErrorKind::Api, "Order response carries no uuid"))?
      .to_string();
    let encounter_uuid = saved
      .get("encounter")
      .and_then(|e| e.get("uuid"))
      .and_then(Value::as_str)
      .map(str::to_string)
      .or_else(|| ctx.encounter_uuid.clone());
    event!(Level::DEBUG, order_uuid = %uuid, "Drug order saved.");
    Ok(SubmittedOrder { uuid, encounter_uuid })
  }

  #[instrument(name = "RestClinicalApi::fetch_encounter_order_uuids", skip(self), err(Display))]
  async fn fetch_encounter_order_uuids(&self, encounter_uuid: &str) -> WorkflowResult<Vec<String>> {
    let mut url = self.endpoint(&["encounter", encounter_uuid])?;
    url.query_pairs_mut().append_pair("v", ENCOUNTER_ORDERS_VIEW);
    let resp = self.http.get(url).send().await?;
    let encounter: Value = Self::read_json(resp).await?;
    Ok(
      encounter
        .get("orders")
        .and_then(Value::as_array)
        .map(|orders| {
          orders
            .iter()
            .filter_map(|o| o.get("uuid").and_then(Value::as_str).map(str::to_string))
            .collect()
        })
        .unwrap_or_default(),
    )
  }

  #[instrument(name = "RestClinicalApi::save_workflow_data", skip_all, fields(patient_uuid = %submission.patient), err(Display))]
  async fn save_workflow_data(&self, submission: &WorkflowSubmission) -> WorkflowResult<Option<String>> {
    let url = self.endpoint(&["consultationworkflow", "workflowdata"])?;
    let resp = self.http.post(url).json(submission).send().await?;
    let saved: Value = Self::read_json(resp).await?;
    Ok(saved.get("uuid").and_then(Value::as_str).map(str::to_string))
  }

  #[instrument(name = "RestClinicalApi::fetch_program_enrollments", skip(self), err(Display))]
  async fn fetch_program_enrollments(&self, patient_uuid: &str) -> WorkflowResult<Vec<ProgramEnrollment>> {
    let mut url = self.endpoint(&["programenrollment"])?;
    url
      .query_pairs_mut()
      .append_pair("patient", patient_uuid)
      .append_pair("v", ENROLLMENT_VIEW);
    let resp = self.http.get(url).send().await?;
    let page: Value = Self::read_json(resp).await?;
    let results = page.get("results").and_then(Value::as_array).cloned().unwrap_or_default();
    Ok(
      results
        .iter()
        .filter(|e| e.get("dateCompleted").map_or(true, Value::is_null))
        .filter_map(|e| {
          let program_uuid = e.get("program")?.get("uuid")?.as_str()?.to_string();
          Some(ProgramEnrollment {
            program_uuid,
            state_uuid: current_state(e),
          })
        })
        .collect(),
    )
  }

  #[instrument(name = "RestClinicalApi::sync_patient", skip_all, fields(patient_uuid = %request.patient_uuid), err(Display))]
  async fn sync_patient(&self, request: &PatientSyncRequest) -> WorkflowResult<()> {
    let url = self
      .patient_sync_url
      .clone()
      .ok_or_else(|| WorkflowError::Configuration("Patient sync URL is not configured".to_string()))?;
    let resp = self.http.post(url).json(request).send().await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      let message = match classify_api_error(status.as_u16(), &body) {
        WorkflowError::Api { message, .. } => message,
        other => other.to_string(),
      };
      return Err(WorkflowError::api(ApiErrorKind::ExternalSystem, message));
    }
    Ok(())
  }
}
