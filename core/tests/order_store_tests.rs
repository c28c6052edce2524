// tests/order_store_tests.rs
mod common;

use common::*;
use mise::{
  ChefResolver, LoadOutcome, LoadPhase, Liveness, MarketplaceApi, MemoryStore, MiseError, OrderId, OrderLedger,
  OrderStatus, OrderStore, Schedule, StoreHandle,
};
use serde_json::json;
use std::sync::Arc;

struct Fixture {
  api: Arc<FakeApi>,
  ledger: OrderLedger,
  liveness: Liveness,
  store: OrderStore,
}

fn fixture() -> Fixture {
  setup_tracing();
  let api = FakeApi::new();
  let remote: Arc<dyn MarketplaceApi> = api.clone();
  let ledger = OrderLedger::new(StoreHandle::new(Arc::new(MemoryStore::new())));
  let liveness = Liveness::new();
  let resolver = Arc::new(ChefResolver::new(Arc::clone(&remote)));
  let store = OrderStore::new(remote, ledger.clone(), resolver, liveness.clone());
  Fixture {
    api,
    ledger,
    liveness,
    store,
  }
}

fn ids(raw: &[&str]) -> Vec<OrderId> {
  raw.iter().map(|id| OrderId::from(*id)).collect()
}

#[tokio::test]
async fn test_server_list_replaces_orders_and_grows_ledger() {
  let f = fixture();
  f.api.push_list(Ok(vec![order("A", "confirmed"), order("B", "awaiting_payment")]));
  f.api.push_list(Ok(vec![order("B", "confirmed")]));

  assert_eq!(f.store.load().await, LoadOutcome::Server { orders: 2 });
  assert_eq!(f.ledger.list(), ids(&["A", "B"]));

  assert_eq!(f.store.load().await, LoadOutcome::Server { orders: 1 });
  let book = f.store.snapshot();
  assert_eq!(book.orders.len(), 1);
  assert_eq!(book.orders[0].status, OrderStatus::Confirmed);
  assert_eq!(book.phase, LoadPhase::Ready);
  assert_eq!(book.completed_loads, 2);
  // A was not in the latest list; the ledger still holds it.
  assert_eq!(f.ledger.list(), ids(&["A", "B"]));
}

#[tokio::test]
async fn test_empty_list_rehydrates_from_ledger_and_prunes_missing() {
  let f = fixture();
  f.ledger.remember_all(&ids(&["A", "B"]));
  f.api.put_order(order("A", "awaiting_payment"));

  let outcome = f.store.load().await;

  assert_eq!(outcome, LoadOutcome::Rehydrated { found: 1, pruned: 1 });
  let book = f.store.snapshot();
  assert_eq!(book.orders.iter().map(|o| o.id.clone()).collect::<Vec<_>>(), ids(&["A"]));
  assert_eq!(f.ledger.list(), ids(&["A"]));
  assert_eq!(f.api.calls("get_service_order"), 2);
}

#[tokio::test]
async fn test_transient_rehydrate_failure_keeps_ledger_entry() {
  let f = fixture();
  f.ledger.remember_all(&ids(&["A", "B"]));
  f.api.put_order(order("A", "confirmed"));
  f.api.push_order_result("B", Err(MiseError::Transient("timeout".to_string())));

  let outcome = f.store.load().await;

  assert_eq!(outcome, LoadOutcome::Rehydrated { found: 1, pruned: 0 });
  assert_eq!(f.ledger.list(), ids(&["A", "B"]));
}

#[tokio::test]
async fn test_empty_list_and_empty_ledger_is_ready_with_no_orders() {
  let f = fixture();
  assert_eq!(f.store.load().await, LoadOutcome::Rehydrated { found: 0, pruned: 0 });
  let book = f.store.snapshot();
  assert!(book.orders.is_empty());
  assert_eq!(book.phase, LoadPhase::Ready);
  assert_eq!(f.api.calls("get_service_order"), 0);
}

#[tokio::test]
async fn test_failed_list_keeps_previous_orders() {
  let f = fixture();
  f.api.push_list(Ok(vec![order("A", "confirmed")]));
  f.api.push_list(Err(MiseError::Transient("503 from upstream".to_string())));

  f.store.load().await;
  assert_eq!(f.store.load().await, LoadOutcome::Failed);

  let book = f.store.snapshot();
  assert_eq!(book.orders.len(), 1);
  assert!(matches!(book.phase, LoadPhase::Failed { .. }));
  assert!(book.retryable_error().unwrap().contains("503"));
  assert_eq!(book.completed_loads, 1);
}

#[tokio::test]
async fn test_overlapping_loads_apply_whole_results_and_last_completion_wins() {
  let f = fixture();
  let first_gate = f.api.gate_next_list();
  let second_gate = f.api.gate_next_list();
  f.api.push_list(Ok(vec![order("A", "confirmed"), order("B", "awaiting_payment")]));
  f.api.push_list(Ok(vec![order("C", "draft")]));

  let order_ids = |book: &mise::OrderBook| book.orders.iter().map(|o| o.id.clone()).collect::<Vec<_>>();

  let (first, second, ()) = tokio::join!(f.store.load(), f.store.load(), async {
    while f.api.calls("list_service_orders") < 2 {
      tokio::task::yield_now().await;
    }
    assert!(f.store.snapshot().is_loading());

    // The load that started second finishes first.
    second_gate.notify_one();
    while f.store.snapshot().completed_loads < 1 {
      tokio::task::yield_now().await;
    }
    let book = f.store.snapshot();
    assert_eq!(order_ids(&book), ids(&["C"]));
    assert_eq!(book.phase, LoadPhase::Loading);

    first_gate.notify_one();
  });

  assert_eq!(first, LoadOutcome::Server { orders: 2 });
  assert_eq!(second, LoadOutcome::Server { orders: 1 });
  let book = f.store.snapshot();
  assert_eq!(order_ids(&book), ids(&["A", "B"]));
  assert_eq!(book.phase, LoadPhase::Ready);
  assert_eq!(book.completed_loads, 2);
  assert_eq!(f.ledger.list(), ids(&["C", "A", "B"]));
}

#[tokio::test]
async fn test_load_after_teardown_is_discarded() {
  let f = fixture();
  f.api.set_list(vec![order("A", "confirmed")]);
  f.liveness.kill();

  assert_eq!(f.store.load().await, LoadOutcome::Discarded);
  assert!(f.store.snapshot().orders.is_empty());
  assert_eq!(f.api.calls("list_service_orders"), 0);
}

#[tokio::test]
async fn test_load_prefetches_each_chef_once() {
  let f = fixture();
  f.api.put_chef("7", json!({ "display_name": "Ana Lima", "username": "ana" }));
  f.api.set_list(vec![
    order_with("A", "confirmed", json!({ "chef_id": 7 })),
    order_with("B", "awaiting_payment", json!({ "chef": { "id": "7" } })),
    order_with("C", "draft", json!({ "chef_id": 404 })),
  ]);

  f.store.load().await;
  f.store.load().await;

  assert_eq!(f.api.calls("get_chef_public_profile"), 2);
  let rows = f.store.rows();
  assert_eq!(rows[0].chef.display_name, "Ana Lima");
  assert_eq!(rows[1].chef.profile_path.as_deref(), Some("/chefs/ana?chef_id=7"));
  assert_eq!(rows[2].chef.display_name, mise::GENERIC_CHEF_LABEL);
}

#[tokio::test]
async fn test_regressed_status_is_applied_as_reported() {
  let f = fixture();
  f.api.push_list(Ok(vec![order("A", "cancelled")]));
  f.api.push_list(Ok(vec![order("A", "awaiting_payment")]));

  f.store.load().await;
  f.store.load().await;

  assert_eq!(f.store.find(&OrderId::from("A")).unwrap().status, OrderStatus::AwaitingPayment);
}

#[tokio::test]
async fn test_orders_keep_schedule_and_money_fields() {
  let f = fixture();
  f.api.set_list(vec![order_with(
    "A",
    "awaiting_payment",
    json!({
      "service_date": "2026-11-02",
      "service_start_time": "18:30",
      "total_value": "120.00",
      "currency": "eur",
      "household_size": "4",
      "is_subscription": "yes"
    }),
  )]);

  f.store.load().await;
  let order = f.store.find(&OrderId::from("A")).unwrap();

  assert!(matches!(order.schedule, Schedule::Slot { start: Some(_), .. }));
  assert_eq!(order.total_value.as_deref(), Some("120.00"));
  assert_eq!(order.currency.as_deref(), Some("EUR"));
  assert_eq!(order.household_size, Some(4));
  assert!(order.is_subscription);
  assert!(order.status.is_payable());
}
