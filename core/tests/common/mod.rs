// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use mise::model::JsonMap;
use mise::{
  CartHandoff, ChefCard, ChefDetail, ConnectionAction, ConnectionRequest, ConnectionStatus, MarketplaceApi,
  MealPaymentStatus, MiseError, MiseResult, Notifier, OrderId, ServiceOrder, Tone,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::Level;

// --- Record builders ---

pub fn record(value: Value) -> JsonMap {
  match value {
    Value::Object(map) => map,
    other => panic!("test record must be a JSON object, got {other}"),
  }
}

pub fn order(id: &str, status: &str) -> ServiceOrder {
  order_with(id, status, json!({}))
}

/// An order with extra raw fields merged in, e.g. chef references.
pub fn order_with(id: &str, status: &str, extra: Value) -> ServiceOrder {
  let mut fields = record(json!({ "id": id, "status": status }));
  fields.extend(record(extra));
  ServiceOrder::from_record(Value::Object(fields)).expect("valid test order")
}

pub fn connection(id: &str, status: &str, initiated_by: &str) -> ConnectionRequest {
  ConnectionRequest::from_record(json!({ "id": id, "status": status, "initiated_by": initiated_by }))
    .expect("valid test connection")
}

pub fn meal_status(status: &str) -> MealPaymentStatus {
  MealPaymentStatus {
    paid: false,
    status: status.to_string(),
    session_status: None,
  }
}

// --- Scripted remote API ---

/// In-memory `MarketplaceApi` whose responses are scripted per test.
///
/// Queued results are consumed first; once a queue is empty the fallback
/// (the `orders` map, `meal_fallback`, `Ok(())`) answers.
#[derive(Default)]
pub struct FakeApi {
  pub list_results: Mutex<VecDeque<MiseResult<Vec<ServiceOrder>>>>,
  pub list_fallback: Mutex<Vec<ServiceOrder>>,
  /// One gate per upcoming `list_service_orders` call; the call takes its result, then waits.
  pub list_gates: Mutex<VecDeque<Arc<Notify>>>,
  pub orders: Mutex<HashMap<String, ServiceOrder>>,
  pub order_results: Mutex<HashMap<String, VecDeque<MiseResult<ServiceOrder>>>>,
  pub cancel_results: Mutex<VecDeque<MiseResult<()>>>,
  pub chefs: Mutex<HashMap<String, Value>>,
  pub transient_chefs: Mutex<HashSet<String>>,
  pub connections: Mutex<Vec<ConnectionRequest>>,
  pub list_connection_results: Mutex<VecDeque<MiseResult<Vec<ConnectionRequest>>>>,
  pub transition_results: Mutex<VecDeque<MiseResult<()>>>,
  pub meal_results: Mutex<VecDeque<MiseResult<MealPaymentStatus>>>,
  pub meal_fallback: Mutex<Option<MealPaymentStatus>>,
  /// When set, `transition_connection` signals `transition_entered` and waits here.
  pub transition_gate: Mutex<Option<Arc<Notify>>>,
  pub transition_entered: Arc<Notify>,
  calls: Mutex<Vec<String>>,
}

impl FakeApi {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn calls(&self, method: &str) -> usize {
    self.calls.lock().iter().filter(|c| c.as_str() == method).count()
  }

  pub fn call_log(&self) -> Vec<String> {
    self.calls.lock().clone()
  }

  pub fn push_list(&self, result: MiseResult<Vec<ServiceOrder>>) {
    self.list_results.lock().push_back(result);
  }

  pub fn gate_next_list(&self) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    self.list_gates.lock().push_back(Arc::clone(&gate));
    gate
  }

  pub fn set_list(&self, orders: Vec<ServiceOrder>) {
    *self.list_fallback.lock() = orders;
  }

  pub fn put_order(&self, order: ServiceOrder) {
    self.orders.lock().insert(order.id.to_string(), order);
  }

  pub fn push_order_result(&self, id: &str, result: MiseResult<ServiceOrder>) {
    self.order_results.lock().entry(id.to_string()).or_default().push_back(result);
  }

  pub fn put_chef(&self, id: &str, profile: Value) {
    self.chefs.lock().insert(id.to_string(), profile);
  }

  pub fn push_meal(&self, result: MiseResult<MealPaymentStatus>) {
    self.meal_results.lock().push_back(result);
  }

  pub fn set_meal_fallback(&self, status: MealPaymentStatus) {
    *self.meal_fallback.lock() = Some(status);
  }

  pub fn push_transition(&self, result: MiseResult<()>) {
    self.transition_results.lock().push_back(result);
  }

  pub fn gate_transitions(&self) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    *self.transition_gate.lock() = Some(Arc::clone(&gate));
    gate
  }

  fn record_call(&self, method: &str) {
    self.calls.lock().push(method.to_string());
  }
}

#[async_trait]
impl MarketplaceApi for FakeApi {
  async fn list_service_orders(&self) -> MiseResult<Vec<ServiceOrder>> {
    self.record_call("list_service_orders");
    let scripted = self.list_results.lock().pop_front();
    let gate = self.list_gates.lock().pop_front();
    if let Some(gate) = gate {
      gate.notified().await;
    }
    match scripted {
      Some(result) => result,
      None => Ok(self.list_fallback.lock().clone()),
    }
  }

  async fn get_service_order(&self, id: &OrderId) -> MiseResult<ServiceOrder> {
    self.record_call("get_service_order");
    let scripted = self.order_results.lock().get_mut(id.as_str()).and_then(|q| q.pop_front());
    if let Some(result) = scripted {
      return result;
    }
    self
      .orders
      .lock()
      .get(id.as_str())
      .cloned()
      .ok_or_else(|| MiseError::not_found(format!("order {id}")))
  }

  async fn cancel_service_order(&self, _id: &OrderId) -> MiseResult<()> {
    self.record_call("cancel_service_order");
    self.cancel_results.lock().pop_front().unwrap_or(Ok(()))
  }

  async fn get_chef_public_profile(&self, chef_id: &str) -> MiseResult<ChefDetail> {
    self.record_call("get_chef_public_profile");
    tokio::task::yield_now().await;
    if self.transient_chefs.lock().contains(chef_id) {
      return Err(MiseError::Transient("profile service unavailable".to_string()));
    }
    let profile = self.chefs.lock().get(chef_id).cloned();
    match profile {
      Some(value) => ChefDetail::from_value(value),
      None => Err(MiseError::not_found(format!("chef {chef_id}"))),
    }
  }

  async fn list_connections(&self) -> MiseResult<Vec<ConnectionRequest>> {
    self.record_call("list_connections");
    let scripted = self.list_connection_results.lock().pop_front();
    match scripted {
      Some(result) => result,
      None => Ok(self.connections.lock().clone()),
    }
  }

  async fn transition_connection(&self, id: &str, action: ConnectionAction) -> MiseResult<()> {
    self.record_call("transition_connection");
    let gate = self.transition_gate.lock().clone();
    if let Some(gate) = gate {
      self.transition_entered.notify_one();
      gate.notified().await;
    }
    let result = self.transition_results.lock().pop_front().unwrap_or(Ok(()));
    if result.is_ok() {
      // The server applies the action; the client only sees it after a refetch.
      let next = match action {
        ConnectionAction::Accept => ConnectionStatus::Accepted,
        ConnectionAction::Decline => ConnectionStatus::Declined,
        ConnectionAction::End => ConnectionStatus::Ended,
      };
      if let Some(c) = self.connections.lock().iter_mut().find(|c| c.id == id) {
        c.status = next;
      }
    }
    result
  }

  async fn get_meal_order_payment_status(
    &self,
    order_id: &OrderId,
    _session_id: Option<&str>,
  ) -> MiseResult<MealPaymentStatus> {
    self.record_call("get_meal_order_payment_status");
    let scripted = self.meal_results.lock().pop_front();
    match scripted {
      Some(result) => result,
      None => self
        .meal_fallback
        .lock()
        .clone()
        .ok_or_else(|| MiseError::not_found(format!("meal order {order_id}"))),
    }
  }
}

// --- Collaborators ---

#[derive(Default)]
pub struct RecordingNotifier {
  pub notices: Mutex<Vec<(String, Tone)>>,
}

impl RecordingNotifier {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn all(&self) -> Vec<(String, Tone)> {
    self.notices.lock().clone()
  }

  pub fn count(&self, text: &str) -> usize {
    self.notices.lock().iter().filter(|(t, _)| t == text).count()
  }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, text: &str, tone: Tone) {
    self.notices.lock().push((text.to_string(), tone));
  }
}

pub struct RecordingCart {
  pub proceed: AtomicBool,
  pub loaded: Mutex<Vec<(OrderId, ChefCard)>>,
  pub opened: AtomicUsize,
}

impl RecordingCart {
  pub fn new(proceed: bool) -> Arc<Self> {
    Arc::new(Self {
      proceed: AtomicBool::new(proceed),
      loaded: Mutex::new(Vec::new()),
      opened: AtomicUsize::new(0),
    })
  }

  pub fn opened(&self) -> usize {
    self.opened.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl CartHandoff for RecordingCart {
  async fn load_existing_order(&self, order: &ServiceOrder, chef: &ChefCard) -> bool {
    self.loaded.lock().push((order.id.clone(), chef.clone()));
    self.proceed.load(Ordering::SeqCst)
  }

  async fn open_cart(&self) {
    self.opened.fetch_add(1, Ordering::SeqCst);
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
