// carepath/src/visibility/operators.rs

//! Comparison operators applied between a looked-up field value and a
//! condition's expected value.

use crate::definition::condition::ConditionOperator;
use serde_json::Value;
use std::cmp::Ordering;

/// Applies `operator` to `actual` (the looked-up field, `None` when absent) and
/// `expected` (the condition's configured value).
pub fn apply(operator: &ConditionOperator, actual: Option<&Value>, expected: &Value) -> bool {
  match operator {
    ConditionOperator::Equals => actual.map_or(false, |a| loosely_equal(a, expected)),
    ConditionOperator::Not => !actual.map_or(expected.is_null(), |a| loosely_equal(a, expected)),
    ConditionOperator::Contains => actual.map_or(false, |a| contains(a, expected)),
    ConditionOperator::Gt => compare(actual, expected) == Some(Ordering::Greater),
    ConditionOperator::Lt => compare(actual, expected) == Some(Ordering::Less),
    ConditionOperator::Gte => matches!(compare(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
    ConditionOperator::Lte => matches!(compare(actual, expected), Some(Ordering::Less | Ordering::Equal)),
    ConditionOperator::In => match (actual, expected) {
      (Some(a), Value::Array(candidates)) => candidates.iter().any(|c| loosely_equal(a, c)),
      _ => false,
    },
    ConditionOperator::Exists => actual.map_or(false, |a| !a.is_null()),
    ConditionOperator::Unknown(_) => false,
  }
}

/// JSON equality, except that numbers compare by value (`1` equals `1.0`).
fn loosely_equal(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
    _ => a == b,
  }
}

/// Substring test for strings, membership test for arrays.
fn contains(haystack: &Value, needle: &Value) -> bool {
  match (haystack, needle) {
    (Value::String(h), Value::String(n)) => h.contains(n.as_str()),
    (Value::Array(items), n) => items.iter().any(|item| loosely_equal(item, n)),
    _ => false,
  }
}

fn as_number(v: &Value) -> Option<f64> {
  match v {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  }
}

/// Numeric ordering when both sides read as numbers, lexicographic when both
/// are strings, `None` otherwise.
fn compare(actual: Option<&Value>, expected: &Value) -> Option<Ordering> {
  let actual = actual?;
  if let (Some(a), Some(b)) = (as_number(actual), as_number(expected)) {
    return a.partial_cmp(&b);
  }
  match (actual, expected) {
    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
    _ => None,
  }
}
