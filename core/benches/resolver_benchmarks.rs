use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mise::model::JsonMap;
use mise::resolver::{resolve_chef_id, resolve_display_name, resolve_profile_path};
use mise::{
  ChefDetail, ChefResolver, ConnectionAction, ConnectionRequest, MarketplaceApi, MealPaymentStatus, MiseError,
  MiseResult, OrderId, ServiceOrder,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::runtime::Runtime; // To run async code within Criterion

// --- Record shapes seen in the wild ---
fn record_shapes() -> Vec<JsonMap> {
  let shapes = [
    json!({ "id": 1, "chef_id": 7, "chef_username": "ana" }),
    json!({ "id": 2, "chef": { "id": "7", "slug": "ana-lima", "display_name": "Ana Lima" } }),
    json!({ "id": 3, "chef": { "user": { "id": 9, "first_name": "Bruno", "last_name": "Reis" } } }),
    json!({ "id": 4, "chef_user_id": "12", "chef_profile_url": "https://elsewhere.example/chefs/caio/" }),
    json!({ "id": 5, "status": "draft" }),
  ];
  shapes
    .into_iter()
    .filter_map(|v| match v {
      Value::Object(map) => Some(map),
      _ => None,
    })
    .collect()
}

// --- Profile API that answers instantly ---
struct InstantProfiles;

#[async_trait]
impl MarketplaceApi for InstantProfiles {
  async fn list_service_orders(&self) -> MiseResult<Vec<ServiceOrder>> {
    Ok(Vec::new())
  }

  async fn get_service_order(&self, id: &OrderId) -> MiseResult<ServiceOrder> {
    Err(MiseError::not_found(format!("order {id}")))
  }

  async fn cancel_service_order(&self, _id: &OrderId) -> MiseResult<()> {
    Ok(())
  }

  async fn get_chef_public_profile(&self, chef_id: &str) -> MiseResult<ChefDetail> {
    ChefDetail::from_value(json!({ "id": chef_id, "username": format!("chef{chef_id}"), "name": "Bench Chef" }))
  }

  async fn list_connections(&self) -> MiseResult<Vec<ConnectionRequest>> {
    Ok(Vec::new())
  }

  async fn transition_connection(&self, _id: &str, _action: ConnectionAction) -> MiseResult<()> {
    Ok(())
  }

  async fn get_meal_order_payment_status(
    &self,
    order_id: &OrderId,
    _session_id: Option<&str>,
  ) -> MiseResult<MealPaymentStatus> {
    Err(MiseError::not_found(format!("meal order {order_id}")))
  }
}

// --- Benchmark Functions ---

fn bench_rule_resolution(c: &mut Criterion) {
  let mut group = c.benchmark_group("RuleResolution");
  let shapes = record_shapes();
  group.throughput(Throughput::Elements(shapes.len() as u64));

  group.bench_function("chef_id", |b| {
    b.iter(|| shapes.iter().filter_map(|r| resolve_chef_id(r)).count())
  });
  group.bench_function("display_name", |b| {
    b.iter(|| shapes.iter().filter_map(|r| resolve_display_name(r, None)).count())
  });
  group.bench_function("profile_path", |b| {
    b.iter(|| {
      shapes
        .iter()
        .filter_map(|r| resolve_profile_path(r, None, resolve_chef_id(r).as_deref()))
        .count()
    })
  });
  group.finish();
}

fn bench_card_for_cached(c: &mut Criterion) {
  let mut group = c.benchmark_group("CardForCached");
  let rt = Runtime::new().unwrap();

  for num_orders in [10usize, 100, 1000].iter() {
    let orders: Vec<ServiceOrder> = (0..*num_orders)
      .map(|i| {
        ServiceOrder::from_record(json!({ "id": i, "status": "confirmed", "chef_id": i % 25 }))
          .expect("bench order")
      })
      .collect();
    let resolver = ChefResolver::new(Arc::new(InstantProfiles));
    rt.block_on(resolver.prefetch((0..25).map(|i: usize| i.to_string())));

    group.throughput(Throughput::Elements(*num_orders as u64));
    group.bench_with_input(BenchmarkId::from_parameter(num_orders), &orders, |b, orders| {
      b.iter(|| orders.iter().map(|o| resolver.card_for(o)).count())
    });
  }
  group.finish();
}

fn bench_prefetch_cold(c: &mut Criterion) {
  let mut group = c.benchmark_group("PrefetchCold");
  let rt = Runtime::new().unwrap();

  for distinct in [1usize, 10, 50].iter() {
    group.bench_with_input(BenchmarkId::from_parameter(distinct), distinct, |b, &distinct| {
      b.to_async(&rt).iter(|| async move {
        let resolver = ChefResolver::new(Arc::new(InstantProfiles));
        resolver.prefetch((0..distinct * 2).map(|i| (i % distinct).to_string())).await;
      })
    });
  }
  group.finish();
}

criterion_group!(benches, bench_rule_resolution, bench_card_for_cached, bench_prefetch_cold);
criterion_main!(benches);
