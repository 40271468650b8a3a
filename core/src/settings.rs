// carepath/src/settings.rs

//! Runtime settings, loaded from the environment (and a `.env` file if present).

use crate::api::sync::PatientSyncMappings;
use crate::error::{WorkflowError, WorkflowResult};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const ENV_BASE_URL: &str = "CAREPATH_OPENMRS_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "CAREPATH_REQUEST_TIMEOUT_SECS";
pub const ENV_PATIENT_SYNC_ENABLED: &str = "CAREPATH_PATIENT_SYNC_ENABLED";
pub const ENV_PATIENT_SYNC_URL: &str = "CAREPATH_PATIENT_SYNC_URL";
pub const ENV_PATIENT_SYNC_MAPPINGS: &str = "CAREPATH_PATIENT_SYNC_MAPPINGS";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct PatientSyncSettings {
  pub url: Url,
  pub mappings: PatientSyncMappings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  /// Root of the clinical data server, e.g. `https://host/openmrs`.
  pub base_url: Url,
  pub request_timeout: Duration,
  /// `None` when patient sync is disabled.
  pub patient_sync: Option<PatientSyncSettings>,
}

impl Settings {
  pub fn new(base_url: Url) -> Self {
    Self {
      base_url,
      request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
      patient_sync: None,
    }
  }

  pub fn with_patient_sync(mut self, url: Url, mappings: PatientSyncMappings) -> Self {
    self.patient_sync = Some(PatientSyncSettings { url, mappings });
    self
  }

  pub fn from_env() -> WorkflowResult<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name)
        .map_err(|e| WorkflowError::Configuration(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let parse_url = |var_name: &str, raw: String| {
      Url::parse(raw.trim()).map_err(|e| WorkflowError::Configuration(format!("Invalid {}: {}", var_name, e)))
    };

    let base_url = parse_url(ENV_BASE_URL, get_env(ENV_BASE_URL)?)?;

    let timeout_secs = get_env(ENV_REQUEST_TIMEOUT_SECS)
      .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
      .trim()
      .parse::<u64>()
      .map_err(|e| WorkflowError::Configuration(format!("Invalid {}: {}", ENV_REQUEST_TIMEOUT_SECS, e)))?;

    let sync_enabled = get_env(ENV_PATIENT_SYNC_ENABLED)
      .unwrap_or_else(|_| "false".to_string())
      .trim()
      .parse::<bool>()
      .map_err(|e| WorkflowError::Configuration(format!("Invalid {} value: {}", ENV_PATIENT_SYNC_ENABLED, e)))?;

    let patient_sync = if sync_enabled {
      let url = parse_url(ENV_PATIENT_SYNC_URL, get_env(ENV_PATIENT_SYNC_URL)?)?;
      let mappings = match get_env(ENV_PATIENT_SYNC_MAPPINGS) {
        Ok(path) => PatientSyncMappings::from_file(&PathBuf::from(path))?,
        Err(_) => PatientSyncMappings::default(),
      };
      Some(PatientSyncSettings { url, mappings })
    } else {
      None
    };

    tracing::info!(
      base_url = %base_url,
      timeout_secs,
      patient_sync = patient_sync.is_some(),
      "carepath settings loaded."
    );

    Ok(Self {
      base_url,
      request_timeout: Duration::from_secs(timeout_secs),
      patient_sync,
    })
  }
}
