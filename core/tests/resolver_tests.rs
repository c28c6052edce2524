// tests/resolver_tests.rs
mod common;

use common::*;
use mise::resolver::{resolve_chef_id, resolve_display_name, resolve_profile_path, sanitize_profile_url};
use mise::{ChefDetail, ChefResolver, MarketplaceApi, GENERIC_CHEF_LABEL};
use serde_json::json;
use std::sync::Arc;

fn resolver_over(api: &Arc<FakeApi>) -> ChefResolver {
  let api: Arc<dyn MarketplaceApi> = api.clone();
  ChefResolver::new(api)
}

#[test]
fn test_chef_id_follows_rule_priority() {
  assert_eq!(resolve_chef_id(&record(json!({ "chef": { "id": 7 } }))).as_deref(), Some("7"));
  assert_eq!(
    resolve_chef_id(&record(json!({ "chef_id": " 12 ", "chef": { "id": 7 } }))).as_deref(),
    Some("12")
  );
  assert_eq!(
    resolve_chef_id(&record(json!({ "chef": { "user": { "id": "u-3" } } }))).as_deref(),
    Some("u-3")
  );
  assert_eq!(resolve_chef_id(&record(json!({ "chef_id": "", "chef": null }))), None);
}

#[test]
fn test_profile_path_prefers_username_then_slug_then_numeric_id() {
  let rec = record(json!({ "chef_username": "ana", "chef_slug": "ana-lima", "chef_id": 7 }));
  assert_eq!(resolve_profile_path(&rec, None, Some("7")).as_deref(), Some("/chefs/ana?chef_id=7"));

  let rec = record(json!({ "chef_slug": "ana-lima", "chef_id": 7 }));
  assert_eq!(resolve_profile_path(&rec, None, None).as_deref(), Some("/chefs/ana-lima"));

  let rec = record(json!({ "chef_username": "../admin", "chef_id": 7 }));
  assert_eq!(resolve_profile_path(&rec, None, Some("7")).as_deref(), Some("/chefs/7?chef_id=7"));
}

#[test]
fn test_profile_path_uses_detail_when_record_lacks_fields() {
  let rec = record(json!({ "chef_id": "c-1" }));
  let detail = ChefDetail::from_value(json!({ "chef": { "id": "c-1", "user": { "username": "bruno" } } })).unwrap();
  assert_eq!(resolve_profile_path(&rec, Some(&detail), Some("c-1")).as_deref(), Some("/chefs/bruno?chef_id=c-1"));
}

#[test]
fn test_profile_path_falls_back_to_sanitized_url() {
  let rec = record(json!({ "chef_profile_url": "https://elsewhere.example/chefs/ana/" }));
  assert_eq!(resolve_profile_path(&rec, None, None).as_deref(), Some("/chefs/ana"));

  let rec = record(json!({ "chef_profile_url": "javascript:alert(1)" }));
  assert_eq!(resolve_profile_path(&rec, None, None), None);

  let rec = record(json!({}));
  assert_eq!(resolve_profile_path(&rec, None, None), None);
}

#[test]
fn test_sanitize_profile_url_keeps_only_same_origin_paths() {
  assert_eq!(sanitize_profile_url("/chefs/ana").as_deref(), Some("/chefs/ana"));
  assert_eq!(sanitize_profile_url("chefs/ana").as_deref(), Some("/chefs/ana"));
  assert_eq!(sanitize_profile_url("https://evil.example/chefs/ana?x=1").as_deref(), Some("/chefs/ana"));
  assert_eq!(sanitize_profile_url("https://evil.example/"), None);
  assert_eq!(sanitize_profile_url("//evil.example"), None);
  assert_eq!(sanitize_profile_url("mailto:chef@example.com"), None);
  assert_eq!(sanitize_profile_url("   "), None);
}

#[test]
fn test_display_name_fallbacks() {
  let rec = record(json!({ "chef": { "first_name": "Ana", "last_name": "Lima" } }));
  assert_eq!(resolve_display_name(&rec, None).as_deref(), Some("Ana Lima"));

  let rec = record(json!({ "chef_name": "Chef Ana", "chef": { "first_name": "Ana" } }));
  assert_eq!(resolve_display_name(&rec, None).as_deref(), Some("Chef Ana"));

  let rec = record(json!({ "chef_id": 7 }));
  let detail = ChefDetail::from_value(json!({ "first_name": "Bruno" })).unwrap();
  assert_eq!(resolve_display_name(&rec, Some(&detail)).as_deref(), Some("Bruno"));
  assert_eq!(resolve_display_name(&rec, None), None);
}

#[tokio::test]
async fn test_concurrent_lookups_share_one_request() {
  setup_tracing();
  let api = FakeApi::new();
  api.put_chef("7", json!({ "display_name": "Ana Lima" }));
  let resolver = resolver_over(&api);

  let (a, b) = tokio::join!(resolver.fetch_detail("7"), resolver.fetch_detail("7"));
  assert!(a.is_some());
  assert_eq!(a, b);
  assert_eq!(api.calls("get_chef_public_profile"), 1);

  resolver.fetch_detail("7").await;
  assert_eq!(api.calls("get_chef_public_profile"), 1);
}

#[tokio::test]
async fn test_not_found_is_cached_but_transient_failure_is_not() {
  setup_tracing();
  let api = FakeApi::new();
  api.transient_chefs.lock().insert("8".to_string());
  let resolver = resolver_over(&api);

  assert!(resolver.fetch_detail("99").await.is_none());
  assert!(resolver.fetch_detail("99").await.is_none());
  assert_eq!(resolver.cached("99"), Some(None));

  assert!(resolver.fetch_detail("8").await.is_none());
  assert_eq!(resolver.cached("8"), None);
  api.transient_chefs.lock().clear();
  api.put_chef("8", json!({ "name": "Caio" }));
  assert!(resolver.fetch_detail("8").await.is_some());

  assert_eq!(api.calls("get_chef_public_profile"), 3);
}

#[tokio::test]
async fn test_prefetch_skips_blank_duplicate_and_known_ids() {
  setup_tracing();
  let api = FakeApi::new();
  api.put_chef("1", json!({ "name": "One" }));
  api.put_chef("2", json!({ "name": "Two" }));
  let resolver = resolver_over(&api);

  resolver.fetch_detail("1").await;
  resolver
    .prefetch(["1", "2", " 2 ", "", "3"].into_iter().map(String::from))
    .await;

  assert_eq!(api.calls("get_chef_public_profile"), 3);
  assert!(resolver.cached("2").flatten().is_some());
  assert_eq!(resolver.cached("3"), Some(None));
}

#[tokio::test]
async fn test_card_uses_cache_and_generic_label() {
  setup_tracing();
  let api = FakeApi::new();
  api.put_chef("7", json!({ "display_name": "Ana Lima", "username": "ana" }));
  let resolver = resolver_over(&api);
  let order = order_with("1", "confirmed", json!({ "chef_id": 7 }));

  let before = resolver.card_for(&order);
  assert_eq!(before.display_name, GENERIC_CHEF_LABEL);
  assert_eq!(before.profile_path.as_deref(), Some("/chefs/7?chef_id=7"));

  resolver.fetch_detail("7").await;
  let after = resolver.card_for(&order);
  assert_eq!(after.chef_id.as_deref(), Some("7"));
  assert_eq!(after.display_name, "Ana Lima");
  assert_eq!(after.profile_path.as_deref(), Some("/chefs/ana?chef_id=7"));
}
