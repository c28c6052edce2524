// mise/src/view.rs

//! The customer orders view: wires the ledger, resolver, order store, payment
//! poller and connection manager together and drives them through mount,
//! user actions and teardown.

use crate::connections::{ConnectionGroups, ConnectionManager};
use crate::core::{LoadOutcome, Liveness, Notifier, Tone};
use crate::error::{MiseError, MiseResult};
use crate::ledger::OrderLedger;
use crate::markers::{CheckoutRedirect, PaymentMarkers, PendingPayment};
use crate::model::{ConnectionAction, OrderId, Party};
use crate::orders::{OrderBook, OrderRow, OrderStore, Reload};
use crate::poller::{
  MealPaymentSource, PaymentPoller, PaymentStatusSource, PollConfig, PollOutcome, PollState, ServiceOrderSource,
};
use crate::remote::{CartHandoff, MarketplaceApi};
use crate::resolver::{resolve_chef_id, ChefResolver};
use crate::storage::{KeyValueStore, StoreHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

pub const ORDER_CANCELLED_MESSAGE: &str = "Your booking has been cancelled.";
pub const CANCEL_FAILED_MESSAGE: &str = "We couldn't cancel this booking. Please try again.";
pub const CANNOT_CANCEL_MESSAGE: &str = "This booking can no longer be cancelled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
  pub poll: PollConfig,
  /// Whose perspective the connection board takes.
  pub viewer: Party,
}

impl Default for ViewConfig {
  fn default() -> Self {
    Self {
      poll: PollConfig::default(),
      viewer: Party::Customer,
    }
  }
}

/// What `mount` did.
pub struct MountReport {
  pub load: LoadOutcome,
  /// The payment poll started by this mount, if a redirect or pending marker called for one.
  pub poll: Option<(OrderId, JoinHandle<PollOutcome>)>,
}

/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct OrdersView {
  store: Arc<OrderStore>,
  ledger: OrderLedger,
  markers: PaymentMarkers,
  resolver: Arc<ChefResolver>,
  poller: Arc<PaymentPoller>,
  meal_source: Arc<MealPaymentSource>,
  service_source: Arc<ServiceOrderSource>,
  connections: Arc<ConnectionManager>,
  api: Arc<dyn MarketplaceApi>,
  notifier: Arc<dyn Notifier>,
  cart: Arc<dyn CartHandoff>,
  liveness: Liveness,
  ledger_watch: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl OrdersView {
  pub fn new(
    api: Arc<dyn MarketplaceApi>,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    cart: Arc<dyn CartHandoff>,
    config: ViewConfig,
  ) -> Self {
    let liveness = Liveness::new();
    let handle = StoreHandle::new(storage);
    let ledger = OrderLedger::new(handle.clone());
    let markers = PaymentMarkers::new(handle);
    let resolver = Arc::new(ChefResolver::new(Arc::clone(&api)));
    let store = Arc::new(OrderStore::new(
      Arc::clone(&api),
      ledger.clone(),
      Arc::clone(&resolver),
      liveness.clone(),
    ));
    let reload: Arc<dyn Reload> = store.clone();
    let poller = Arc::new(PaymentPoller::new(
      config.poll,
      markers.clone(),
      Arc::clone(&notifier),
      reload,
      liveness.clone(),
    ));
    let connections = Arc::new(ConnectionManager::new(
      Arc::clone(&api),
      Arc::clone(&notifier),
      config.viewer,
      liveness.clone(),
    ));

    Self {
      meal_source: Arc::new(MealPaymentSource::new(Arc::clone(&api))),
      service_source: Arc::new(ServiceOrderSource::new(Arc::clone(&api))),
      store,
      ledger,
      markers,
      resolver,
      poller,
      connections,
      api,
      notifier,
      cart,
      liveness,
      ledger_watch: Arc::new(Mutex::new(None)),
    }
  }

  /// Starts a payment poll if the customer just came back from checkout or an
  /// earlier payment is still unconfirmed, then loads orders and connections.
  /// The poll runs in the background alongside the initial load.
  #[instrument(name = "OrdersView::mount", skip_all, fields(redirect = redirect.is_some()))]
  pub async fn mount(&self, redirect: Option<CheckoutRedirect>) -> MountReport {
    let pending = match redirect {
      Some(redirect) => match redirect.target(&self.markers) {
        Some(target) => {
          self.markers.record(&target.order_id, target.session_id.as_deref());
          Some(target)
        }
        None => {
          warn!("checkout redirect without an order to confirm");
          None
        }
      },
      None => self.markers.pending(),
    };

    let poll = pending.map(|pending| {
      info!(order_id = %pending.order_id, "confirming payment");
      let order_id = pending.order_id.clone();
      (order_id, self.start_payment_poll(pending))
    });

    let (load, connections) = tokio::join!(self.store.load(), self.connections.refresh());
    if let Err(e) = connections {
      debug!(error = %e, "connections unavailable on mount");
    }
    MountReport { load, poll }
  }

  /// Spawns a background poll. Meal checkouts carry a session id and are read
  /// through the payment-status endpoint; otherwise the service order is read.
  pub fn start_payment_poll(&self, pending: PendingPayment) -> JoinHandle<PollOutcome> {
    let poller = Arc::clone(&self.poller);
    let source: Arc<dyn PaymentStatusSource> = if pending.session_id.is_some() {
      self.meal_source.clone() as Arc<dyn PaymentStatusSource>
    } else {
      self.service_source.clone() as Arc<dyn PaymentStatusSource>
    };
    tokio::spawn(async move { poller.poll(source.as_ref(), pending).await })
  }

  pub fn poll_state(&self, order_id: &OrderId) -> PollState {
    self.poller.state(order_id)
  }

  pub async fn load(&self) -> LoadOutcome {
    self.store.load().await
  }

  /// Reloads whenever another instance changes the ledger. Replaces any earlier watch.
  pub fn watch_ledger(&self) {
    let mut events = self.ledger.subscribe();
    let view = self.clone();
    let task = tokio::spawn(async move {
      loop {
        match events.recv().await {
          Ok(event) if view.ledger.is_foreign_change(&event) => {
            if !view.liveness.is_alive() {
              break;
            }
            debug!(origin = %event.origin, "ledger changed elsewhere, reloading");
            view.store.load().await;
          }
          Ok(_) => {}
          Err(RecvError::Lagged(skipped)) => {
            debug!(skipped, "ledger watch lagged, reloading");
            view.store.load().await;
          }
          Err(RecvError::Closed) => break,
        }
      }
    });
    if let Some(previous) = self.ledger_watch.lock().replace(task) {
      previous.abort();
    }
  }

  pub fn orders(&self) -> OrderBook {
    self.store.snapshot()
  }

  pub fn rows(&self) -> Vec<OrderRow> {
    self.store.rows()
  }

  pub fn ledger(&self) -> &OrderLedger {
    &self.ledger
  }

  pub fn markers(&self) -> &PaymentMarkers {
    &self.markers
  }

  pub fn resolver(&self) -> &ChefResolver {
    &self.resolver
  }

  pub fn meal_source(&self) -> &MealPaymentSource {
    &self.meal_source
  }

  pub fn connections(&self) -> &ConnectionManager {
    &self.connections
  }

  pub fn connection_groups(&self) -> ConnectionGroups {
    self.connections.groups()
  }

  pub async fn respond(&self, connection_id: &str, action: ConnectionAction) -> MiseResult<()> {
    self.connections.respond(connection_id, action).await
  }

  /// Requests cancellation of a payable order and reloads on success.
  #[instrument(name = "OrdersView::cancel_order", skip(self), fields(%order_id))]
  pub async fn cancel_order(&self, order_id: &OrderId) -> MiseResult<()> {
    if let Some(order) = self.store.find(order_id) {
      if !order.status.is_payable() {
        self.notify(CANNOT_CANCEL_MESSAGE, Tone::Error);
        return Err(MiseError::IllegalTransition {
          action: "cancel".to_string(),
          from: order.status.to_string(),
        });
      }
    }

    match self.api.cancel_service_order(order_id).await {
      Ok(()) => {
        self.notify(ORDER_CANCELLED_MESSAGE, Tone::Success);
        self.store.load().await;
        Ok(())
      }
      Err(e) => {
        let message = e.server_detail().unwrap_or(CANCEL_FAILED_MESSAGE).to_string();
        warn!(error = %e, "cancel request failed");
        self.notify(&message, Tone::Error);
        Err(MiseError::ActionFailed {
          action: "cancel".to_string(),
          message,
        })
      }
    }
  }

  /// Hands a payable order to the cart so the customer can finish paying.
  /// Returns whether the customer went ahead; the cart only opens if so.
  #[instrument(name = "OrdersView::resume_checkout", skip(self), fields(%order_id))]
  pub async fn resume_checkout(&self, order_id: &OrderId) -> MiseResult<bool> {
    let order = self
      .store
      .find(order_id)
      .ok_or_else(|| MiseError::not_found(format!("order {order_id}")))?;
    if !order.status.is_payable() {
      return Err(MiseError::IllegalTransition {
        action: "checkout".to_string(),
        from: order.status.to_string(),
      });
    }
    if let Some(chef_id) = resolve_chef_id(&order) {
      self.resolver.fetch_detail(&chef_id).await;
    }
    let chef = self.resolver.card_for(&order);

    let proceeded = self.cart.load_existing_order(&order, &chef).await;
    if proceeded {
      self.cart.open_cart().await;
    } else {
      debug!("customer kept the current cart");
    }
    Ok(proceeded)
  }

  /// Stops state updates from background work. In-flight requests are not aborted.
  pub fn teardown(&self) {
    self.liveness.kill();
    if let Some(task) = self.ledger_watch.lock().take() {
      task.abort();
    }
    info!("orders view torn down");
  }

  pub fn is_mounted(&self) -> bool {
    self.liveness.is_alive()
  }

  fn notify(&self, text: &str, tone: Tone) {
    if self.liveness.is_alive() {
      self.notifier.notify(text, tone);
    }
  }
}
