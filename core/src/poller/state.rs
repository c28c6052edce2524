// mise/src/poller/state.rs

//! Per-order poll state machine.
//!
//! ```text
//! Idle ──begin──▶ Polling ──▶ Confirmed | Exhausted | CancelledElsewhere
//!   ▲                              │
//!   └──────── begin (resume) ◀─────┘
//! ```
//! Only `Polling` refuses `begin`, which is what makes starting a poll idempotent.

use crate::error::{MiseError, MiseResult};
use crate::model::OrderId;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PollState {
  #[default]
  Idle,
  Polling { attempt: u32 },
  Confirmed { attempts: u32 },
  Exhausted { attempts: u32 },
  CancelledElsewhere { attempts: u32 },
}

impl PollState {
  pub fn is_active(&self) -> bool {
    matches!(self, PollState::Polling { .. })
  }

  fn label(&self) -> &'static str {
    match self {
      PollState::Idle => "idle",
      PollState::Polling { .. } => "polling",
      PollState::Confirmed { .. } => "confirmed",
      PollState::Exhausted { .. } => "exhausted",
      PollState::CancelledElsewhere { .. } => "cancelled_elsewhere",
    }
  }

  pub fn begin(&self) -> MiseResult<PollState> {
    match self {
      PollState::Polling { .. } => Err(self.illegal("begin")),
      _ => Ok(PollState::Polling { attempt: 0 }),
    }
  }

  pub fn next_attempt(&self) -> MiseResult<PollState> {
    match self {
      PollState::Polling { attempt } => Ok(PollState::Polling { attempt: attempt + 1 }),
      _ => Err(self.illegal("attempt")),
    }
  }

  /// Moves a running poll to one of its final states.
  pub fn settle(&self, to: PollState) -> MiseResult<PollState> {
    match (self, &to) {
      (
        PollState::Polling { .. },
        PollState::Confirmed { .. } | PollState::Exhausted { .. } | PollState::CancelledElsewhere { .. },
      ) => Ok(to),
      _ => Err(self.illegal(to.label())),
    }
  }

  fn illegal(&self, action: &str) -> MiseError {
    MiseError::IllegalTransition {
      action: action.to_string(),
      from: self.label().to_string(),
    }
  }
}

/// Poll state for every order this process has polled.
#[derive(Debug, Default)]
pub struct PollRegistry {
  states: Mutex<HashMap<OrderId, PollState>>,
}

impl PollRegistry {
  pub fn state(&self, id: &OrderId) -> PollState {
    self.states.lock().get(id).cloned().unwrap_or_default()
  }

  /// Returns `false` if a poll for `id` is already running.
  pub fn try_begin(&self, id: &OrderId) -> bool {
    let mut states = self.states.lock();
    let current = states.get(id).cloned().unwrap_or_default();
    match current.begin() {
      Ok(next) => {
        states.insert(id.clone(), next);
        true
      }
      Err(_) => false,
    }
  }

  pub fn record_attempt(&self, id: &OrderId) -> MiseResult<u32> {
    self.transition(id, PollState::next_attempt).map(|state| match state {
      PollState::Polling { attempt } => attempt,
      _ => 0,
    })
  }

  pub fn settle(&self, id: &OrderId, to: PollState) -> MiseResult<PollState> {
    self.transition(id, |current| current.settle(to))
  }

  fn transition(
    &self,
    id: &OrderId,
    step: impl FnOnce(&PollState) -> MiseResult<PollState>,
  ) -> MiseResult<PollState> {
    let mut states = self.states.lock();
    let current = states.get(id).cloned().unwrap_or_default();
    let next = step(&current)?;
    states.insert(id.clone(), next.clone());
    Ok(next)
  }
}
