// carepath/src/core/shared_state.rs
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared ownership with interior mutability over a session's state,
/// using parking_lot::RwLock.
///
/// IMPORTANT: Lock guards obtained from this struct are blocking and MUST NOT
/// be held across `.await` suspension points in asynchronous code.
#[derive(Debug)]
pub struct SharedState<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> SharedState<T> {
  pub fn new(data: T) -> Self {
    SharedState(Arc::new(RwLock::new(data)))
  }

  /// Acquires a read lock.
  /// The returned guard MUST be dropped before any `.await` point.
  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  /// Acquires a write lock.
  /// The returned guard MUST be dropped before any `.await` point.
  pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Guard over one part of the state, e.g. `state.map_read(|s| s.steps_data())`.
  pub fn map_read<F, U: ?Sized>(&self, f: F) -> MappedRwLockReadGuard<'_, U>
  where
    F: FnOnce(&T) -> &U,
  {
    RwLockReadGuard::map(self.read(), f)
  }

  /// Clones the current value out from under the lock.
  pub fn snapshot(&self) -> T
  where
    T: Clone,
  {
    self.read().clone()
  }
}

impl<T: Send + Sync + 'static> Clone for SharedState<T> {
  fn clone(&self) -> Self {
    SharedState(Arc::clone(&self.0))
  }
}
