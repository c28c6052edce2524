// mise/src/orders/store.rs

//! The customer's service orders as last reported by the server.

use crate::core::{LoadOutcome, Liveness, ViewState};
use crate::error::MiseError;
use crate::ledger::OrderLedger;
use crate::model::{OrderId, ServiceOrder};
use crate::remote::MarketplaceApi;
use crate::resolver::{resolve_chef_id, ChefCard, ChefResolver};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadPhase {
  #[default]
  Idle,
  Loading,
  Ready,
  /// The last list request failed. Orders from the previous load are still shown.
  Failed { message: String },
}

/// State owned by the order store. Replaced as a whole by each completed load.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
  pub orders: Vec<ServiceOrder>,
  pub phase: LoadPhase,
  pub completed_loads: u64,
  in_flight: usize,
}

impl OrderBook {
  pub fn get(&self, id: &OrderId) -> Option<&ServiceOrder> {
    self.orders.iter().find(|o| &o.id == id)
  }

  pub fn is_loading(&self) -> bool {
    self.phase == LoadPhase::Loading
  }

  /// Message for a dismissible "try again" notice, if the last load failed.
  pub fn retryable_error(&self) -> Option<&str> {
    match &self.phase {
      LoadPhase::Failed { message } => Some(message.as_str()),
      _ => None,
    }
  }

  pub fn chef_ids(&self) -> Vec<String> {
    let mut ids: Vec<String> = self.orders.iter().filter_map(|o| resolve_chef_id(o)).collect();
    ids.sort();
    ids.dedup();
    ids
  }
}

/// One order with its chef display data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRow {
  pub order: ServiceOrder,
  pub chef: ChefCard,
}

pub struct OrderStore {
  api: Arc<dyn MarketplaceApi>,
  ledger: OrderLedger,
  resolver: Arc<ChefResolver>,
  state: ViewState<OrderBook>,
  liveness: Liveness,
}

impl OrderStore {
  pub fn new(
    api: Arc<dyn MarketplaceApi>,
    ledger: OrderLedger,
    resolver: Arc<ChefResolver>,
    liveness: Liveness,
  ) -> Self {
    Self {
      api,
      ledger,
      resolver,
      state: ViewState::default(),
      liveness,
    }
  }

  pub fn state(&self) -> ViewState<OrderBook> {
    self.state.clone()
  }

  pub fn snapshot(&self) -> OrderBook {
    self.state.snapshot()
  }

  pub fn find(&self, id: &OrderId) -> Option<ServiceOrder> {
    self.state.read().get(id).cloned()
  }

  pub fn rows(&self) -> Vec<OrderRow> {
    let orders = self.state.map_read(|book| &book.orders).clone();
    orders
      .into_iter()
      .map(|order| {
        let chef = self.resolver.card_for(&order);
        OrderRow { order, chef }
      })
      .collect()
  }

  /// Fetches the authoritative list and applies it in one step.
  ///
  /// A non-empty list replaces local orders and every id is remembered in the
  /// ledger. An empty list falls back to fetching each ledger id; ids the
  /// server no longer knows are dropped from the ledger. If the list request
  /// itself fails, previous orders stay and the phase becomes `Failed`.
  /// Overlapping calls are allowed: each applies its complete result
  /// atomically and the last one to finish wins.
  #[instrument(name = "OrderStore::load", skip(self))]
  pub async fn load(&self) -> LoadOutcome {
    if !self.liveness.is_alive() {
      return LoadOutcome::Discarded;
    }
    self.state.update(|book| {
      book.in_flight += 1;
      book.phase = LoadPhase::Loading;
    });

    let (fetched, outcome) = match self.api.list_service_orders().await {
      Ok(orders) if !orders.is_empty() => {
        self.ledger.remember_all(orders.iter().map(|o| &o.id));
        let count = orders.len();
        (Ok(orders), LoadOutcome::Server { orders: count })
      }
      Ok(_) => {
        let (orders, pruned) = self.rehydrate_from_ledger().await;
        let found = orders.len();
        (Ok(orders), LoadOutcome::Rehydrated { found, pruned })
      }
      Err(e) => {
        warn!(error = %e, "order list request failed, keeping previous orders");
        (Err(e), LoadOutcome::Failed)
      }
    };

    if !self.liveness.is_alive() {
      debug!("view torn down, discarding load result");
      return LoadOutcome::Discarded;
    }

    self.state.update(|book| {
      book.in_flight = book.in_flight.saturating_sub(1);
      let failure = match fetched {
        Ok(orders) => {
          warn_on_regressions(&book.orders, &orders);
          book.orders = orders;
          book.completed_loads += 1;
          None
        }
        Err(e) => Some(e),
      };
      book.phase = match (book.in_flight, failure) {
        (0, None) => LoadPhase::Ready,
        (0, Some(e)) => LoadPhase::Failed { message: e.to_string() },
        _ => LoadPhase::Loading,
      };
    });
    info!(?outcome, "order load applied");

    if outcome != LoadOutcome::Failed {
      let chef_ids = self.state.read().chef_ids();
      self.resolver.prefetch(chef_ids).await;
    }
    outcome
  }

  #[instrument(skip(self))]
  async fn rehydrate_from_ledger(&self) -> (Vec<ServiceOrder>, usize) {
    let ids = self.ledger.list();
    if ids.is_empty() {
      return (Vec::new(), 0);
    }
    debug!(count = ids.len(), "server list empty, rehydrating from ledger");

    let results = join_all(ids.iter().map(|id| async move { (id, self.api.get_service_order(id).await) })).await;

    let mut orders = Vec::with_capacity(results.len());
    let mut pruned = 0;
    for (id, result) in results {
      match result {
        Ok(order) => orders.push(order),
        Err(MiseError::NotFound { .. }) => {
          info!(order_id = %id, "order gone on server, dropping from ledger");
          self.ledger.forget(id);
          pruned += 1;
        }
        Err(e) => debug!(order_id = %id, error = %e, "order unavailable this cycle"),
      }
    }
    (orders, pruned)
  }
}

fn warn_on_regressions(previous: &[ServiceOrder], next: &[ServiceOrder]) {
  for order in next {
    if let Some(before) = previous.iter().find(|p| p.id == order.id) {
      if order.status.regresses_from(&before.status) {
        warn!(
          order_id = %order.id,
          from = %before.status,
          to = %order.status,
          "server reported a terminal order as open again; applying server value"
        );
      }
    }
  }
}

/// Something that can re-sync itself from the server, e.g. after a payment settles.
#[async_trait]
pub trait Reload: Send + Sync {
  async fn reload(&self);
}

#[async_trait]
impl Reload for OrderStore {
  async fn reload(&self) {
    self.load().await;
  }
}
