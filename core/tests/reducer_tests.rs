// tests/reducer_tests.rs
mod common;
use carepath::{
  ConditionOperator, RenderType, StepCondition, StepPayload, StepVisibility, WorkflowAction, WorkflowConfig,
  WorkflowError, WorkflowState, WorkflowStep,
};
use common::*;
use serde_json::json;
use std::sync::Arc;

fn state_for(config: WorkflowConfig) -> WorkflowState {
  WorkflowState::new_on(Arc::new(config), male_patient(), None, reference_date())
}

fn weighted_config(weights: &[f64]) -> WorkflowConfig {
  let steps = weights
    .iter()
    .enumerate()
    .map(|(i, w)| WorkflowStep::new(format!("s{}", i), RenderType::Form).with_weight(*w))
    .collect();
  WorkflowConfig::new("wf-weights", "Weighted", steps).unwrap()
}

#[test]
fn test_initial_state() {
  setup_tracing();
  let state = state_for(abc_config());
  assert_eq!(state.current_step_index(), 0);
  assert_eq!(state.visible_step_ids(), vec!["A", "C"]);
  assert!(state.completed_steps().is_empty());
  assert!(state.steps_data().is_empty());
  assert_eq!(state.progress(), 0.0);
  assert!(!state.is_last_step());
  assert_eq!(state.current_step().map(|s| s.id.as_str()), Some("A"));
}

#[test]
fn test_go_to_step_out_of_range_fails_and_leaves_state() {
  setup_tracing();
  let mut state = state_for(abc_config());
  let before = state.current_step_index();

  let err = state.dispatch(WorkflowAction::GoToStep { index: 2 }).unwrap_err();
  match err {
    WorkflowError::StepNotVisible { index, visible_count } => {
      assert_eq!(index, 2);
      assert_eq!(visible_count, 2);
    }
    other => panic!("Expected StepNotVisible, got {:?}", other),
  }
  assert_eq!(state.current_step_index(), before);
}

#[test]
fn test_go_to_step_sets_is_last_step() {
  setup_tracing();
  let mut state = state_for(weighted_config(&[1.0, 1.0, 1.0]));

  state.dispatch(WorkflowAction::GoToStep { index: 1 }).unwrap();
  assert_eq!(state.current_step_index(), 1);
  assert!(!state.is_last_step());

  state.dispatch(WorkflowAction::GoToStep { index: 2 }).unwrap();
  assert_eq!(state.current_step_index(), 2);
  assert!(state.is_last_step());

  state.dispatch(WorkflowAction::GoToStep { index: 0 }).unwrap();
  assert!(!state.is_last_step());
}

#[test]
fn test_next_and_previous_are_clamped() {
  setup_tracing();
  let mut state = state_for(weighted_config(&[1.0, 1.0]));

  state.dispatch(WorkflowAction::GoToPreviousStep).unwrap();
  assert_eq!(state.current_step_index(), 0);

  state.dispatch(WorkflowAction::GoToNextStep).unwrap();
  assert_eq!(state.current_step_index(), 1);
  assert!(state.is_last_step());

  // No-op at the end.
  state.dispatch(WorkflowAction::GoToNextStep).unwrap();
  assert_eq!(state.current_step_index(), 1);
  assert!(state.is_last_step());
}

#[test]
fn test_complete_step_overwrites_data_and_keeps_set_membership() {
  setup_tracing();
  let mut state = state_for(weighted_config(&[1.0, 1.0, 1.0]));

  state.dispatch(WorkflowAction::complete("s0", form_with("weight", json!(60)))).unwrap();
  state.dispatch(WorkflowAction::GoToStep { index: 0 }).unwrap();
  state.dispatch(WorkflowAction::complete("s0", form_with("weight", json!(62)))).unwrap();

  assert_eq!(state.completed_steps().len(), 1);
  assert!(state.is_completed("s0"));
  assert_eq!(state.step_data("s0"), Some(&form_with("weight", json!(62))));
  assert_eq!(state.current_step_index(), 1);
}

#[test]
fn test_progress_is_weighted_over_all_configured_steps() {
  setup_tracing();
  let mut state = state_for(weighted_config(&[1.0, 2.0, 1.0]));

  state.dispatch(WorkflowAction::complete("s0", form_with("x", json!(1)))).unwrap();
  assert_eq!(state.progress(), 25.0);

  state.dispatch(WorkflowAction::complete("s1", form_with("x", json!(1)))).unwrap();
  assert_eq!(state.progress(), 75.0);

  state.dispatch(WorkflowAction::complete("s2", form_with("x", json!(1)))).unwrap();
  assert_eq!(state.progress(), 100.0);
}

#[test]
fn test_completing_a_skips_hidden_b() {
  setup_tracing();
  let mut state = state_for(abc_config());

  state.dispatch(WorkflowAction::complete("A", form_with("gender", json!("male")))).unwrap();

  assert_eq!(state.visible_step_ids(), vec!["A", "C"]);
  assert_eq!(state.current_step().map(|s| s.id.as_str()), Some("C"));
  assert_eq!(state.current_step_index(), 1);
  assert!(state.is_last_step());
  // A has weight 1 out of a configured total of 4 (B counts while hidden).
  assert_eq!(state.progress(), 25.0);
}

#[test]
fn test_completing_a_reveals_b() {
  setup_tracing();
  let mut state = state_for(abc_config());

  state.dispatch(WorkflowAction::complete("A", form_with("gender", json!("female")))).unwrap();

  assert_eq!(state.visible_step_ids(), vec!["A", "B", "C"]);
  assert_eq!(state.current_step().map(|s| s.id.as_str()), Some("B"));
  assert!(!state.is_last_step());
}

#[test]
fn test_update_then_complete_matches_direct_complete() {
  setup_tracing();
  let payload = form_with("gender", json!("female"));

  let mut via_update = state_for(abc_config());
  via_update.dispatch(WorkflowAction::update("A", payload.clone())).unwrap();
  via_update.dispatch(WorkflowAction::complete("A", payload.clone())).unwrap();

  let mut direct = state_for(abc_config());
  direct.dispatch(WorkflowAction::complete("A", payload.clone())).unwrap();

  assert_eq!(via_update.step_data("A"), direct.step_data("A"));
  assert_eq!(via_update.current_step_index(), direct.current_step_index());
  assert_eq!(via_update.completed_steps(), direct.completed_steps());
  assert_eq!(via_update.progress(), direct.progress());
}

#[test]
fn test_update_step_data_does_not_complete_or_advance() {
  setup_tracing();
  let mut state = state_for(abc_config());

  state.dispatch(WorkflowAction::update("A", form_with("gender", json!("female")))).unwrap();

  assert_eq!(state.current_step_index(), 0);
  assert!(state.completed_steps().is_empty());
  assert_eq!(state.progress(), 0.0);
  // Visibility follows in-progress data too.
  assert_eq!(state.visible_step_ids(), vec!["A", "B", "C"]);
}

#[test]
fn test_hidden_step_keeps_completion_and_data() {
  setup_tracing();
  let mut state = state_for(abc_config());

  state.dispatch(WorkflowAction::complete("A", form_with("gender", json!("female")))).unwrap();
  state
    .dispatch(WorkflowAction::complete("B", StepPayload::empty_for(&RenderType::Medications)))
    .unwrap();
  assert_eq!(state.progress(), 75.0);

  // Editing A hides B again; what B captured is retained.
  state.dispatch(WorkflowAction::GoToStep { index: 0 }).unwrap();
  state.dispatch(WorkflowAction::update("A", form_with("gender", json!("male")))).unwrap();

  assert_eq!(state.visible_step_ids(), vec!["A", "C"]);
  assert!(state.is_completed("B"));
  assert!(state.step_data("B").is_some());
  assert_eq!(state.progress(), 75.0);
}

#[test]
fn test_current_index_is_clamped_when_steps_disappear() {
  setup_tracing();
  let steps = vec![
    WorkflowStep::new("screen", RenderType::Form),
    WorkflowStep::new("followup", RenderType::Form).with_visibility(StepVisibility::all(vec![StepCondition::step(
      "screen",
      "positive",
      ConditionOperator::Equals,
      json!(true),
    )])),
  ];
  let mut state = state_for(WorkflowConfig::new("wf-clamp", "Clamp", steps).unwrap());

  state.dispatch(WorkflowAction::update("screen", form_with("positive", json!(true)))).unwrap();
  state.dispatch(WorkflowAction::GoToStep { index: 1 }).unwrap();
  assert!(state.is_last_step());

  state.dispatch(WorkflowAction::update("screen", form_with("positive", json!(false)))).unwrap();
  assert_eq!(state.visible_step_ids(), vec!["screen"]);
  assert_eq!(state.current_step_index(), 0);
  assert!(state.is_last_step());
}

#[test]
fn test_data_actions_for_unknown_steps_fail() {
  setup_tracing();
  let mut state = state_for(abc_config());

  let err = state.dispatch(WorkflowAction::complete("Z", form_with("x", json!(1)))).unwrap_err();
  assert!(matches!(err, WorkflowError::StepNotFound { ref step_id } if step_id == "Z"));

  let err = state.dispatch(WorkflowAction::update("Z", form_with("x", json!(1)))).unwrap_err();
  assert!(matches!(err, WorkflowError::StepNotFound { .. }));

  assert!(state.steps_data().is_empty());
  assert!(state.completed_steps().is_empty());
}

#[test]
fn test_unknown_action_leaves_state_unchanged() {
  setup_tracing();
  let mut state = state_for(abc_config());
  state.dispatch(WorkflowAction::complete("A", form_with("gender", json!("male")))).unwrap();

  let action: WorkflowAction = serde_json::from_value(json!({"type": "RESET_EVERYTHING"})).unwrap();
  assert_eq!(action, WorkflowAction::Unknown);
  state.dispatch(action).unwrap();

  assert_eq!(state.current_step_index(), 1);
  assert!(state.is_completed("A"));
}

#[test]
fn test_actions_decode_from_host_json() {
  setup_tracing();
  let mut state = state_for(abc_config());

  let complete: WorkflowAction = serde_json::from_value(json!({
    "type": "COMPLETE_STEP",
    "stepId": "A",
    "data": {"kind": "form", "data": {"obs": [{"formFieldPath": "rfe-forms-gender", "value": "female"}]}}
  }))
  .unwrap();
  state.dispatch(complete).unwrap();
  assert_eq!(state.current_step().map(|s| s.id.as_str()), Some("B"));

  let go_to: WorkflowAction = serde_json::from_value(json!({"type": "GO_TO_STEP", "index": 0})).unwrap();
  state.dispatch(go_to).unwrap();
  assert_eq!(state.current_step_index(), 0);
}

#[test]
fn test_workflow_with_no_visible_steps() {
  setup_tracing();
  let steps = vec![WorkflowStep::new("women-only", RenderType::Form).with_visibility(StepVisibility::all(vec![
    StepCondition::patient("gender", ConditionOperator::Equals, json!("female")),
  ]))];
  let mut state = state_for(WorkflowConfig::new("wf-empty", "Empty", steps).unwrap());

  assert!(state.visible_steps().is_empty());
  assert!(state.current_step().is_none());
  assert!(!state.is_last_step());
  state.dispatch(WorkflowAction::GoToNextStep).unwrap();
  assert_eq!(state.current_step_index(), 0);
  assert!(state.dispatch(WorkflowAction::GoToStep { index: 0 }).is_err());
}
