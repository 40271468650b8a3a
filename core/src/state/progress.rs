// carepath/src/state/progress.rs

use crate::definition::workflow::WorkflowConfig;
use std::collections::BTreeSet;

/// Weighted completion percentage.
///
/// The denominator is the weight of every configured step, visible or not; the
/// numerator is the weight of configured steps found in `completed`. A workflow
/// whose total weight is zero reports 0.
pub fn compute_progress(config: &WorkflowConfig, completed: &BTreeSet<String>) -> f64 {
  let total = config.total_weight();
  if total <= 0.0 {
    return 0.0;
  }
  let done: f64 = config
    .steps
    .iter()
    .filter(|s| completed.contains(&s.id))
    .map(|s| s.weight)
    .sum();
  (done / total * 100.0).clamp(0.0, 100.0)
}
