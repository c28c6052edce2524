// mise/src/core/view_state.rs
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared, lockable state owned by one view component (order list, connection board).
///
/// Wraps `Arc<parking_lot::RwLock<T>>` so the component and its background tasks
/// can hold cheap clones of the same state.
///
/// IMPORTANT: guards are blocking and MUST be dropped before any `.await`.
/// Callers apply a whole result inside one `write()` so readers never observe
/// half of an update.
#[derive(Debug)]
pub struct ViewState<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> ViewState<T> {
  pub fn new(data: T) -> Self {
    ViewState(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Guard onto one field, e.g. `state.map_read(|s| &s.orders)`.
  pub fn map_read<F, U: ?Sized>(&self, f: F) -> MappedRwLockReadGuard<'_, U>
  where
    F: FnOnce(&T) -> &U,
  {
    RwLockReadGuard::map(self.read(), f)
  }

  /// Runs `f` under the write lock and returns its result.
  pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
    let mut guard = self.write();
    f(&mut guard)
  }
}

impl<T: Send + Sync + Clone + 'static> ViewState<T> {
  pub fn snapshot(&self) -> T {
    self.read().clone()
  }
}

impl<T: Send + Sync + 'static> Clone for ViewState<T> {
  fn clone(&self) -> Self {
    ViewState(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for ViewState<T> {
  fn default() -> Self {
    Self::new(Default::default())
  }
}
