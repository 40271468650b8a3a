use async_trait::async_trait;
use carepath::api::{OrderContext, PatientSyncRequest, ProgramEnrollment, SubmittedOrder, WorkflowSubmission};
use carepath::{
  visible_steps, ClinicalApi, ConditionOperator, DrugOrder, FormPayload, Observation, Patient, RenderType,
  SharedState, StepCondition, StepPayload, StepRegistry, StepVisibility, VisibilityContext, WorkflowAction,
  WorkflowConfig, WorkflowConfigRecord, WorkflowResult, WorkflowSession, WorkflowState, WorkflowStep,
};
use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Runtime; // To run async code within Criterion

// --- Fixtures ---

fn bench_date() -> NaiveDate {
  NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn bench_patient() -> Patient {
  Patient::new(
    "bench-patient",
    json!({"id": "bench-patient", "gender": "female", "birthDate": "1992-07-04"}),
  )
}

fn form(field: &str, value: serde_json::Value) -> StepPayload {
  StepPayload::Form(FormPayload {
    encounter_uuid: None,
    obs: vec![Observation::for_field(field, value)],
  })
}

/// `num_steps` form steps; every step after the first depends on its
/// predecessor's data and on `conditions_per_step - 1` patient conditions.
fn chained_config(num_steps: usize, conditions_per_step: usize) -> WorkflowConfig {
  let steps = (0..num_steps)
    .map(|i| {
      let step = WorkflowStep::new(format!("step_{}", i), RenderType::Form);
      if i == 0 {
        return step;
      }
      let mut conditions = vec![StepCondition::step(
        format!("step_{}", i - 1),
        "done",
        ConditionOperator::Equals,
        json!(true),
      )];
      for _ in 1..conditions_per_step {
        conditions.push(StepCondition::patient("age", ConditionOperator::Gte, json!(18)));
      }
      step.with_visibility(StepVisibility::all(conditions))
    })
    .collect();
  WorkflowConfig::new("bench-wf", "Bench", steps).unwrap()
}

// Only `save` is reached through the session paths benchmarked here.
struct NoopApi;

#[async_trait]
impl ClinicalApi for NoopApi {
  async fn fetch_workflow_config(&self, workflow_uuid: &str) -> WorkflowResult<WorkflowConfigRecord> {
    Ok(WorkflowConfigRecord {
      uuid: workflow_uuid.to_string(),
      name: String::new(),
      description: String::new(),
      version: String::new(),
      clobdata: None,
    })
  }

  async fn submit_drug_order(&self, _order: &DrugOrder, _ctx: &OrderContext) -> WorkflowResult<SubmittedOrder> {
    Ok(SubmittedOrder {
      uuid: "order".into(),
      encounter_uuid: None,
    })
  }

  async fn fetch_encounter_order_uuids(&self, _encounter_uuid: &str) -> WorkflowResult<Vec<String>> {
    Ok(Vec::new())
  }

  async fn save_workflow_data(&self, _submission: &WorkflowSubmission) -> WorkflowResult<Option<String>> {
    Ok(None)
  }

  async fn fetch_program_enrollments(&self, _patient_uuid: &str) -> WorkflowResult<Vec<ProgramEnrollment>> {
    Ok(Vec::new())
  }

  async fn sync_patient(&self, _request: &PatientSyncRequest) -> WorkflowResult<()> {
    Ok(())
  }
}

// --- Benchmark Functions ---

fn bench_visibility_evaluation(c: &mut Criterion) {
  let mut group = c.benchmark_group("VisibilityEvaluation");
  let patient = bench_patient();

  for num_steps in [5, 20, 50].iter() {
    for conditions in [1, 4].iter() {
      let config = chained_config(*num_steps, *conditions);
      let steps_data: HashMap<String, StepPayload> = (0..*num_steps)
        .map(|i| (format!("step_{}", i), form("done", json!(true))))
        .collect();

      group.throughput(Throughput::Elements(*num_steps as u64));
      group.bench_with_input(
        BenchmarkId::new(format!("{}steps_{}conditions", num_steps, conditions), num_steps),
        &config,
        |b, config| {
          b.iter(|| {
            let ctx = VisibilityContext::new(&patient, &steps_data, bench_date());
            criterion::black_box(visible_steps(config, &ctx).len())
          })
        },
      );
    }
  }
  group.finish();
}

fn bench_reducer_complete_all(c: &mut Criterion) {
  let mut group = c.benchmark_group("ReducerCompleteAll");

  for num_steps in [5, 20, 50].iter() {
    let config = Arc::new(chained_config(*num_steps, 2));
    group.throughput(Throughput::Elements(*num_steps as u64));
    group.bench_with_input(BenchmarkId::from_parameter(num_steps), num_steps, |b, &n| {
      b.iter_batched(
        || WorkflowState::new_on(config.clone(), bench_patient(), None, bench_date()),
        |mut state| {
          for i in 0..n {
            state
              .dispatch(WorkflowAction::complete(format!("step_{}", i), form("done", json!(true))))
              .unwrap();
          }
          criterion::black_box(state.progress())
        },
        criterion::BatchSize::SmallInput,
      );
    });
  }
  group.finish();
}

fn bench_shared_state_access(c: &mut Criterion) {
  let mut group = c.benchmark_group("SharedStateAccess");
  let state = SharedState::new(WorkflowState::new_on(
    Arc::new(chained_config(10, 1)),
    bench_patient(),
    None,
    bench_date(),
  ));

  group.bench_function("read_lock", |b| {
    b.iter(|| {
      let guard = state.read();
      criterion::black_box(guard.current_step_index());
    })
  });

  group.bench_function("snapshot", |b| {
    b.iter(|| criterion::black_box(state.snapshot()))
  });
  group.finish();
}

fn bench_session_next_and_save(c: &mut Criterion) {
  let mut group = c.benchmark_group("SessionNextAndSave");
  let rt = Runtime::new().unwrap();
  let registry = Arc::new(StepRegistry::with_defaults());
  let api: Arc<dyn ClinicalApi> = Arc::new(NoopApi);

  let steps = (0..10)
    .map(|i| WorkflowStep::new(format!("allergies_{}", i), RenderType::Allergies))
    .collect();
  let config = Arc::new(WorkflowConfig::new("bench-session", "Bench", steps).unwrap());

  group.bench_function("ten_snapshot_steps", |b| {
    b.to_async(&rt).iter_batched(
      || {
        let state = WorkflowState::new_on(config.clone(), bench_patient(), None, bench_date());
        WorkflowSession::new(state, registry.clone(), api.clone())
      },
      |session| async move {
        for _ in 0..10 {
          session.next().await.unwrap();
        }
        criterion::black_box(session.save().await.unwrap())
      },
      criterion::BatchSize::SmallInput,
    );
  });
  group.finish();
}

criterion_group!(
  benches,
  bench_visibility_evaluation,
  bench_reducer_complete_all,
  bench_shared_state_access,
  bench_session_next_and_save
);
criterion_main!(benches);
