// carepath/src/session/handler.rs

//! Defines the `StepHandler` trait and the handlers for built-in render types.

use crate::api::{ClinicalApi, OrderContext};
use crate::core::control::{StepAdvance, StepBlock};
use crate::core::patient::Visit;
use crate::core::payload::{DrugOrder, MedicationPayload, StepPayload};
use crate::definition::step::WorkflowStep;
use crate::error::WorkflowResult;
use crate::validation::ValidationErrors;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// What a handler gets to work with when the user asks to leave a step.
///
/// Owned so no state lock is held while the handler awaits remote calls.
#[derive(Clone)]
pub struct StepContext {
  pub step: WorkflowStep,
  /// In-progress data stored through `UPDATE_STEP_DATA`, if any.
  pub buffered: Option<StepPayload>,
  pub patient_uuid: String,
  pub visit: Option<Visit>,
  pub api: Arc<dyn ClinicalApi>,
}

impl StepContext {
  /// The buffered payload, or an empty one of the step's variant.
  pub fn buffered_or_empty(&self) -> StepPayload {
    self
      .buffered
      .clone()
      .unwrap_or_else(|| StepPayload::empty_for(&self.step.render_type))
  }
}

/// Per-render-type behavior run on "next".
#[async_trait]
pub trait StepHandler: Send + Sync {
  async fn on_next(&self, ctx: StepContext) -> WorkflowResult<StepAdvance>;
}

/// Completes with whatever the step buffered. Used for steps that keep their
/// data locally until the user moves on (allergies, appointments, conditions)
/// and for workspace-backed steps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotStepHandler;

#[async_trait]
impl StepHandler for SnapshotStepHandler {
  async fn on_next(&self, ctx: StepContext) -> WorkflowResult<StepAdvance> {
    event!(Level::DEBUG, step_id = %ctx.step.id, buffered = ctx.buffered.is_some(), "Snapshotting buffered step data.");
    Ok(StepAdvance::Complete(ctx.buffered_or_empty()))
  }
}

/// Form steps complete with the observations the form engine emitted. Until
/// the form has produced data the step cannot be left.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormStepHandler;

#[async_trait]
impl StepHandler for FormStepHandler {
  async fn on_next(&self, ctx: StepContext) -> WorkflowResult<StepAdvance> {
    match ctx.buffered {
      Some(payload @ StepPayload::Form(_)) => Ok(StepAdvance::Complete(payload)),
      Some(_) | None => Ok(StepAdvance::Blocked(StepBlock::warning(format!(
        "Form '{}' has not been submitted yet",
        ctx.step.title
      )))),
    }
  }
}

/// Flushes the medication basket: validates pending orders, submits them, and
/// checks that every saved order is attached to the encounter.
#[derive(Debug, Default, Clone, Copy)]
pub struct MedicationStepHandler;

impl MedicationStepHandler {
  /// Field problems of one order, keyed `orders[i].field`.
  pub fn validate_order(index: usize, order: &DrugOrder) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let key = |field: &str| format!("orders[{}].{}", index, field);
    errors.require(&key("drug"), order.drug.as_deref(), "Drug is required");
    if !order.dose.map_or(false, |d| d > 0.0) {
      errors.add(key("dose"), "Dose must be greater than zero");
    }
    errors.require(&key("doseUnits"), order.dose_units.as_deref(), "Dose units are required");
    errors.require(&key("route"), order.route.as_deref(), "Route is required");
    errors.require(&key("frequency"), order.frequency.as_deref(), "Frequency is required");
    if let Some(duration) = order.duration {
      if duration <= 0.0 {
        errors.add(key("duration"), "Duration must be greater than zero");
      }
      errors.require(&key("durationUnits"), order.duration_units.as_deref(), "Duration units are required");
    }
    errors
  }
}

#[async_trait]
impl StepHandler for MedicationStepHandler {
  #[instrument(name = "MedicationStepHandler::on_next", skip_all, fields(step_id = %ctx.step.id))]
  async fn on_next(&self, ctx: StepContext) -> WorkflowResult<StepAdvance> {
    let mut basket = match &ctx.buffered {
      None => MedicationPayload::default(),
      Some(StepPayload::Medications(basket)) => basket.clone(),
      Some(_) => {
        event!(Level::WARN, "Buffered data is not a medication basket; refusing to flush it.");
        return Ok(StepAdvance::Blocked(StepBlock::warning(
          "This step holds data that is not a medication basket. Re-enter the orders before continuing.",
        )));
      }
    };

    let mut errors = ValidationErrors::new();
    for (i, order) in basket.orders.iter().enumerate().filter(|(_, o)| !o.is_saved()) {
      errors.merge(Self::validate_order(i, order));
    }
    if !errors.is_empty() {
      event!(Level::INFO, problems = errors.len(), "Medication basket has incomplete orders.");
      return Ok(StepAdvance::Blocked(
        StepBlock::warning("Some drug orders are incomplete. Complete or remove them before continuing.")
          .with_errors(errors),
      ));
    }

    // Submit pending orders one by one so that orders saved before a failure
    // keep their uuid and are not submitted again on retry.
    for i in 0..basket.orders.len() {
      if basket.orders[i].is_saved() {
        continue;
      }
      let order_ctx = OrderContext {
        patient_uuid: ctx.patient_uuid.clone(),
        encounter_uuid: basket.encounter_uuid.clone(),
        visit_uuid: ctx.visit.as_ref().map(|v| v.uuid.clone()),
      };
      match ctx.api.submit_drug_order(&basket.orders[i], &order_ctx).await {
        Ok(saved) => {
          basket.orders[i].uuid = Some(saved.uuid);
          if basket.encounter_uuid.is_none() {
            basket.encounter_uuid = saved.encounter_uuid;
          }
        }
        Err(e) => {
          event!(Level::ERROR, error = %e, order_index = i, "Drug order submission failed.");
          let mut block = StepBlock::warning(format!("Failed to save drug order: {}", e))
            .with_buffered(StepPayload::Medications(basket.clone()));
          if let Some(kind) = e.api_kind() {
            block = block.with_api_error(kind);
          }
          return Ok(StepAdvance::Blocked(block));
        }
      }
    }

    if basket.orders.is_empty() {
      return Ok(StepAdvance::Complete(StepPayload::Medications(basket)));
    }

    let Some(encounter_uuid) = basket.encounter_uuid.clone() else {
      return Ok(StepAdvance::Blocked(
        StepBlock::warning("Saved drug orders are not linked to an encounter")
          .with_buffered(StepPayload::Medications(basket)),
      ));
    };

    let on_encounter: HashSet<String> = match ctx.api.fetch_encounter_order_uuids(&encounter_uuid).await {
      Ok(uuids) => uuids.into_iter().collect(),
      Err(e) => {
        event!(Level::ERROR, error = %e, %encounter_uuid, "Could not load encounter orders.");
        let mut block = StepBlock::warning(format!("Could not verify saved drug orders: {}", e))
          .with_buffered(StepPayload::Medications(basket));
        if let Some(kind) = e.api_kind() {
          block = block.with_api_error(kind);
        }
        return Ok(StepAdvance::Blocked(block));
      }
    };

    let missing: Vec<&str> = basket
      .orders
      .iter()
      .filter_map(|o| o.uuid.as_deref())
      .filter(|uuid| !on_encounter.contains(*uuid))
      .collect();
    if !missing.is_empty() {
      event!(Level::WARN, missing = ?missing, %encounter_uuid, "Saved orders missing from encounter.");
      let warning = format!("Drug orders not found on the encounter: {}", missing.join(", "));
      return Ok(StepAdvance::Blocked(
        StepBlock::warning(warning).with_buffered(StepPayload::Medications(basket)),
      ));
    }

    event!(Level::INFO, orders = basket.orders.len(), %encounter_uuid, "Medication basket flushed.");
    Ok(StepAdvance::Complete(StepPayload::Medications(basket)))
  }
}
