// carepath/src/api/errors.rs

//! Maps failed responses from the clinical data server into `ApiErrorKind`s.

use crate::error::{ApiErrorKind, WorkflowError};
use serde_json::Value;

/// Markers the server uses when refusing an order that duplicates an active one.
const DUPLICATE_ORDER_MARKERS: &[&str] = &[
  "cannot have more than one active order",
  "order.cannot.have.more.than.one",
  "duplicate order",
  "already has an active order",
];

/// Builds the `WorkflowError` for a non-success response.
///
/// The body is expected in the server's `{"error": {"message", "globalErrors",
/// "fieldErrors"}}` shape; anything else is reported verbatim.
pub fn classify_api_error(status: u16, body: &str) -> WorkflowError {
  let message = error_message(body).unwrap_or_else(|| {
    let trimmed = body.trim();
    if trimmed.is_empty() {
      format!("server responded with status {}", status)
    } else {
      trimmed.to_string()
    }
  });

  let lowered = message.to_lowercase();
  let kind = if DUPLICATE_ORDER_MARKERS.iter().any(|m| lowered.contains(m)) {
    ApiErrorKind::DuplicateOrder
  } else if matches!(status, 502 | 503 | 504) {
    ApiErrorKind::ServerCommunication
  } else {
    ApiErrorKind::Api
  };
  WorkflowError::api(kind, message)
}

/// Joins the top-level message with global and field error messages.
fn error_message(body: &str) -> Option<String> {
  let value: Value = serde_json::from_str(body).ok()?;
  let error = value.get("error")?;

  let mut parts: Vec<String> = Vec::new();
  if let Some(msg) = error.get("message").and_then(Value::as_str) {
    parts.push(msg.to_string());
  }
  if let Some(globals) = error.get("globalErrors").and_then(Value::as_array) {
    parts.extend(globals.iter().filter_map(|g| g.get("message").and_then(Value::as_str)).map(str::to_string));
  }
  if let Some(fields) = error.get("fieldErrors").and_then(Value::as_object) {
    for (field, errs) in fields {
      for msg in errs.as_array().into_iter().flatten().filter_map(|e| e.get("message").and_then(Value::as_str)) {
        parts.push(format!("{}: {}", field, msg));
      }
    }
  }
  parts.dedup();
  if parts.is_empty() {
    None
  } else {
    Some(parts.join("; "))
  }
}
