// carepath/src/error.rs
use anyhow::Error as AnyhowError;
use std::fmt;
use thiserror::Error;

use crate::validation::ValidationErrors;

/// Coarse classification of failures coming back from the clinical data server
/// or from an external interoperability system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
  /// Any other error reported by the server.
  Api,
  /// The server refused an order because an equivalent active order already exists.
  DuplicateOrder,
  /// The external system reached through patient sync failed.
  ExternalSystem,
  /// The request never produced a usable response (connect failure, timeout, bad body).
  ServerCommunication,
}

impl fmt::Display for ApiErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      ApiErrorKind::Api => "api error",
      ApiErrorKind::DuplicateOrder => "duplicate active order",
      ApiErrorKind::ExternalSystem => "external system error",
      ApiErrorKind::ServerCommunication => "server communication error",
    };
    f.write_str(label)
  }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("Step index {index} is not visible ({visible_count} visible steps)")]
  StepNotVisible { index: usize, visible_count: usize },

  #[error("Step not found in workflow configuration: {step_id}")]
  StepNotFound { step_id: String },

  #[error("No step handler registered for render type '{render_type}'")]
  NoStepHandler { render_type: String },

  #[error("Step '{step_id}' is already being advanced")]
  AdvanceInProgress { step_id: String },

  #[error("Workflow configuration '{workflow_uuid}' has no clob data")]
  MissingClobData { workflow_uuid: String },

  #[error("Failed to parse workflow configuration. Source: {source}")]
  ConfigParse {
    #[source]
    source: serde_json::Error,
  },

  #[error("Payload does not match render type '{render_type}'. Source: {source}")]
  InvalidPayload {
    render_type: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Invalid workflow configuration: {message}")]
  InvalidConfig { message: String },

  #[error("Validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("{kind}: {message}")]
  Api { kind: ApiErrorKind, message: String },

  #[error("Error in step handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Configuration error: {0}")]
  Configuration(String),

  #[error("Internal carepath error: {0}")]
  Internal(String),
}

impl WorkflowError {
  pub fn api(kind: ApiErrorKind, message: impl Into<String>) -> Self {
    WorkflowError::Api {
      kind,
      message: message.into(),
    }
  }

  /// Returns the API error kind when this error came from a remote call.
  pub fn api_kind(&self) -> Option<ApiErrorKind> {
    match self {
      WorkflowError::Api { kind, .. } => Some(*kind),
      _ => None,
    }
  }
}

impl From<AnyhowError> for WorkflowError {
  fn from(err: AnyhowError) -> Self {
    WorkflowError::HandlerError { source: err }
  }
}

impl From<ValidationErrors> for WorkflowError {
  fn from(errors: ValidationErrors) -> Self {
    WorkflowError::Validation(errors)
  }
}

impl From<reqwest::Error> for WorkflowError {
  fn from(err: reqwest::Error) -> Self {
    WorkflowError::api(ApiErrorKind::ServerCommunication, err.to_string())
  }
}

pub type WorkflowResult<T, E = WorkflowError> = std::result::Result<T, E>;
