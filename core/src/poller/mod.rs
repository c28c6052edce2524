// mise/src/poller/mod.rs

//! Bounded confirmation of a payment outcome after the checkout redirect.
//!
//! A poll issues one status request, then waits a fixed interval between
//! requests, for at most `max_attempts` requests. It ends as soon as the
//! status is a success (notify, clear the pending marker, reload orders) or
//! is neither success nor payable (clear the marker, reload, stay quiet).
//! Running out of attempts leaves the marker in place so a later mount
//! resumes the poll.

pub mod source;
pub mod state;

use crate::core::{Liveness, Notifier, Tone};
use crate::error::MiseError;
use crate::markers::{PaymentMarkers, PendingPayment};
use crate::model::OrderId;
use crate::orders::Reload;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub use source::{MealPaymentSource, PaymentProbe, PaymentStatusSource, ServiceOrderSource, Verdict};
pub use state::{PollRegistry, PollState};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1500);

pub const PAYMENT_CONFIRMED_MESSAGE: &str = "Payment confirmed. Your booking is all set.";
pub const PAYMENT_PENDING_MESSAGE: &str =
  "We couldn't confirm your payment yet. We'll keep checking the next time you open your orders.";

/// Fixed budget: no backoff, the payment provider settles in bounded time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
  pub max_attempts: u32,
  pub interval: Duration,
}

impl Default for PollConfig {
  fn default() -> Self {
    Self {
      max_attempts: DEFAULT_MAX_ATTEMPTS,
      interval: DEFAULT_INTERVAL,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
  Confirmed { attempts: u32 },
  CancelledElsewhere { attempts: u32, status: String },
  Exhausted { attempts: u32 },
  /// A poll for this order was already running; nothing was done.
  AlreadyPolling,
}

impl PollOutcome {
  pub fn attempts(&self) -> u32 {
    match self {
      PollOutcome::Confirmed { attempts }
      | PollOutcome::CancelledElsewhere { attempts, .. }
      | PollOutcome::Exhausted { attempts } => *attempts,
      PollOutcome::AlreadyPolling => 0,
    }
  }

  /// The non-fatal `ExhaustedPoll` condition, for callers that log or surface it.
  pub fn as_error(&self, order_id: &OrderId) -> Option<MiseError> {
    match self {
      PollOutcome::Exhausted { attempts } => Some(MiseError::ExhaustedPoll {
        order_id: order_id.to_string(),
        attempts: *attempts,
      }),
      _ => None,
    }
  }

  fn final_state(&self) -> Option<PollState> {
    match self {
      PollOutcome::Confirmed { attempts } => Some(PollState::Confirmed { attempts: *attempts }),
      PollOutcome::CancelledElsewhere { attempts, .. } => Some(PollState::CancelledElsewhere { attempts: *attempts }),
      PollOutcome::Exhausted { attempts } => Some(PollState::Exhausted { attempts: *attempts }),
      PollOutcome::AlreadyPolling => None,
    }
  }
}

pub struct PaymentPoller {
  config: PollConfig,
  registry: PollRegistry,
  markers: PaymentMarkers,
  notifier: Arc<dyn Notifier>,
  reload: Arc<dyn Reload>,
  liveness: Liveness,
}

impl PaymentPoller {
  pub fn new(
    config: PollConfig,
    markers: PaymentMarkers,
    notifier: Arc<dyn Notifier>,
    reload: Arc<dyn Reload>,
    liveness: Liveness,
  ) -> Self {
    Self {
      config,
      registry: PollRegistry::default(),
      markers,
      notifier,
      reload,
      liveness,
    }
  }

  pub fn config(&self) -> PollConfig {
    self.config
  }

  pub fn state(&self, order_id: &OrderId) -> PollState {
    self.registry.state(order_id)
  }

  /// Polls `pending.order_id` until it settles or the budget runs out.
  /// Starting a poll for an order that is already being polled is a no-op.
  #[instrument(
    name = "PaymentPoller::poll",
    skip_all,
    fields(order_id = %pending.order_id, source = source.name(), max_attempts = self.config.max_attempts)
  )]
  pub async fn poll(&self, source: &dyn PaymentStatusSource, pending: PendingPayment) -> PollOutcome {
    if !self.registry.try_begin(&pending.order_id) {
      debug!("poll already running for this order");
      return PollOutcome::AlreadyPolling;
    }

    let outcome = self.run_attempts(source, &pending).await;
    if let Some(final_state) = outcome.final_state() {
      if let Err(e) = self.registry.settle(&pending.order_id, final_state) {
        warn!(error = %e, "poll state out of sync");
      }
    }
    self.apply_outcome(&pending.order_id, &outcome).await;
    outcome
  }

  async fn run_attempts(&self, source: &dyn PaymentStatusSource, pending: &PendingPayment) -> PollOutcome {
    let max_attempts = self.config.max_attempts.max(1);
    for attempt in 1..=max_attempts {
      if let Err(e) = self.registry.record_attempt(&pending.order_id) {
        warn!(error = %e, "poll state out of sync");
      }
      match source.probe(pending).await {
        Ok(probe) => match probe.verdict() {
          Verdict::Succeeded => return PollOutcome::Confirmed { attempts: attempt },
          Verdict::ResolvedElsewhere => {
            return PollOutcome::CancelledElsewhere {
              attempts: attempt,
              status: probe.status,
            }
          }
          Verdict::StillPayable => debug!(attempt, status = %probe.status, "payment still pending"),
        },
        Err(MiseError::NotFound { .. }) => {
          return PollOutcome::CancelledElsewhere {
            attempts: attempt,
            status: "not_found".to_string(),
          }
        }
        Err(e) => debug!(attempt, error = %e, "status request failed, retrying within budget"),
      }
      if attempt < max_attempts {
        tokio::time::sleep(self.config.interval).await;
      }
    }
    PollOutcome::Exhausted { attempts: max_attempts }
  }

  /// The marker is persisted state and is cleared even after teardown;
  /// notifications and reloads only happen while the view is alive.
  async fn apply_outcome(&self, order_id: &OrderId, outcome: &PollOutcome) {
    let alive = self.liveness.is_alive();
    match outcome {
      PollOutcome::Confirmed { attempts } => {
        info!(attempts, "payment confirmed");
        self.markers.clear_for(order_id);
        if alive {
          self.notifier.notify(PAYMENT_CONFIRMED_MESSAGE, Tone::Success);
          self.reload.reload().await;
        }
      }
      PollOutcome::CancelledElsewhere { attempts, status } => {
        info!(attempts, %status, "order settled without payment");
        self.markers.clear_for(order_id);
        if alive {
          self.reload.reload().await;
        }
      }
      PollOutcome::Exhausted { attempts } => {
        warn!(attempts, "payment not confirmed within poll budget, marker kept");
        if alive {
          self.notifier.notify(PAYMENT_PENDING_MESSAGE, Tone::Info);
        }
      }
      PollOutcome::AlreadyPolling => {}
    }
  }
}
