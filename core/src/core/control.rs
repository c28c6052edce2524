// mise/src/core/control.rs

//! Liveness of a mounted view and the outcome signals shared by its background work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set while the view is mounted. Background tasks check it before touching
/// view state or emitting notifications; it never aborts in-flight requests.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
  pub fn new() -> Self {
    Liveness(Arc::new(AtomicBool::new(true)))
  }

  pub fn is_alive(&self) -> bool {
    self.0.load(Ordering::Acquire)
  }

  pub fn kill(&self) {
    self.0.store(false, Ordering::Release);
  }
}

impl Default for Liveness {
  fn default() -> Self {
    Self::new()
  }
}

/// Outcome of one `OrderStore::load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
  /// The server list was non-empty and replaced local state.
  Server { orders: usize },
  /// The server list was empty; orders were rebuilt from ledger ids.
  Rehydrated { found: usize, pruned: usize },
  /// The list request failed; previous orders were kept.
  Failed,
  /// The view was torn down before the result arrived.
  Discarded,
}
