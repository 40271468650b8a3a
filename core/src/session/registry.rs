// carepath/src/session/registry.rs

//! Defines `StepRegistry`, the render-type-keyed table of step handlers a
//! session dispatches to.
//!
//! The registry is an ordinary value built at startup and handed to each
//! session, so what is registered never depends on module load order.

use crate::definition::step::RenderType;
use crate::error::{WorkflowError, WorkflowResult};
use crate::session::handler::{FormStepHandler, MedicationStepHandler, SnapshotStepHandler, StepHandler};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

#[derive(Clone, Default)]
pub struct StepRegistry {
  handlers: HashMap<RenderType, Arc<dyn StepHandler>>,
}

impl StepRegistry {
  /// Creates a new, empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with a handler for every built-in render type.
  pub fn with_defaults() -> Self {
    let mut registry = Self::new();
    for render_type in RenderType::known() {
      match render_type {
        RenderType::Form => registry.register(render_type, FormStepHandler),
        RenderType::Medications => registry.register(render_type, MedicationStepHandler),
        _ => registry.register(render_type, SnapshotStepHandler),
      };
    }
    registry
  }

  /// Registers (or replaces) the handler for `render_type`.
  pub fn register<H>(&mut self, render_type: RenderType, handler: H) -> &mut Self
  where
    H: StepHandler + 'static,
  {
    event!(Level::DEBUG, %render_type, "Registering step handler.");
    self.handlers.insert(render_type, Arc::new(handler));
    self
  }

  pub fn contains(&self, render_type: &RenderType) -> bool {
    self.handlers.contains_key(render_type)
  }

  pub fn get(&self, render_type: &RenderType) -> WorkflowResult<Arc<dyn StepHandler>> {
    self.handlers.get(render_type).cloned().ok_or_else(|| {
      event!(Level::ERROR, %render_type, "No step handler registered.");
      WorkflowError::NoStepHandler {
        render_type: render_type.to_string(),
      }
    })
  }
}
