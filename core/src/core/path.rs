// carepath/src/core/path.rs

//! Dot-path lookup over JSON values.

use serde_json::Value;

/// Resolves `a.b.0.c` against `root`. Numeric segments index into arrays.
/// An empty path returns the root itself.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
  if path.is_empty() {
    return Some(root);
  }
  path.split('.').try_fold(root, |current, segment| match current {
    Value::Object(map) => map.get(segment),
    Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
    _ => None,
  })
}
