// mise/src/ledger.rs

//! Durable set of order ids this client has seen.
//!
//! The ledger is only a fallback index for rehydrating orders when the server
//! list comes back empty. It never says anything about an order's status.
//! Every add/remove runs as one read-modify-write under the store's lock, so
//! instances writing concurrently never drop each other's ids.
//! Storage failures are logged and swallowed: the ledger then simply has no
//! ids to offer.

use crate::error::{MiseError, MiseResult};
use crate::model::record::normalize_text;
use crate::model::OrderId;
use crate::storage::{StorageEvent, StoreHandle};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub const LEDGER_KEY: &str = "mise.customer_order_ids";

#[derive(Debug, Clone)]
pub struct OrderLedger {
  store: StoreHandle,
}

impl OrderLedger {
  pub fn new(store: StoreHandle) -> Self {
    Self { store }
  }

  pub fn list(&self) -> Vec<OrderId> {
    self.read_ids().unwrap_or_else(|e| {
      warn!(error = %e, "order ledger unreadable, treating as empty");
      Vec::new()
    })
  }

  pub fn contains(&self, id: &OrderId) -> bool {
    self.list().contains(id)
  }

  pub fn remember(&self, id: &OrderId) {
    self.remember_all(std::iter::once(id));
  }

  /// Adds every id not already present with a single write.
  pub fn remember_all<'a>(&self, ids: impl IntoIterator<Item = &'a OrderId>) {
    self.modify("remember", |current| {
      let mut changed = false;
      for id in ids {
        if !current.contains(id) {
          current.push(id.clone());
          changed = true;
        }
      }
      changed
    });
  }

  pub fn forget(&self, id: &OrderId) {
    self.modify("forget", |current| {
      let before = current.len();
      current.retain(|known| known != id);
      current.len() != before
    });
  }

  /// Overwrites the whole set in one write. Duplicates in `ids` are dropped.
  pub fn replace(&self, ids: &[OrderId]) {
    let mut deduped: Vec<OrderId> = Vec::with_capacity(ids.len());
    for id in ids {
      if !deduped.contains(id) {
        deduped.push(id.clone());
      }
    }
    if let Err(e) = self.write_ids(&deduped) {
      warn!(error = %e, "order ledger replace skipped");
    }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
    self.store.subscribe()
  }

  /// True when `event` is a ledger change made by another instance.
  pub fn is_foreign_change(&self, event: &StorageEvent) -> bool {
    self.store.is_foreign_change(event, LEDGER_KEY)
  }

  fn modify(&self, op: &'static str, apply: impl FnOnce(&mut Vec<OrderId>) -> bool) {
    let mut apply = Some(apply);
    let mut size = 0;
    let mut step = |raw: Option<String>| -> MiseResult<Option<String>> {
      let apply = apply
        .take()
        .ok_or_else(|| MiseError::Internal("order ledger update applied twice".to_string()))?;
      let mut current = parse_ids(raw.as_deref())?;
      if !apply(&mut current) {
        return Ok(None);
      }
      size = current.len();
      Ok(Some(serde_json::to_string(&current)?))
    };
    match self.store.update(LEDGER_KEY, &mut step) {
      Ok(true) => debug!(op, size, "order ledger updated"),
      Ok(false) => {}
      Err(e) => warn!(op, error = %e, "order ledger update skipped"),
    }
  }

  fn read_ids(&self) -> MiseResult<Vec<OrderId>> {
    parse_ids(self.store.get(LEDGER_KEY)?.as_deref())
  }

  fn write_ids(&self, ids: &[OrderId]) -> MiseResult<()> {
    let body = serde_json::to_string(ids)?;
    self.store.set(LEDGER_KEY, &body)
  }
}

fn parse_ids(raw: Option<&str>) -> MiseResult<Vec<OrderId>> {
  let Some(raw) = raw else {
    return Ok(Vec::new());
  };
  let values: Vec<Value> = serde_json::from_str(raw)
    .map_err(|e| MiseError::Storage(format!("order ledger is not a JSON array: {e}")))?;
  let mut ids: Vec<OrderId> = Vec::with_capacity(values.len());
  for id in values.iter().filter_map(normalize_text).map(OrderId::from) {
    if !ids.contains(&id) {
      ids.push(id);
    }
  }
  Ok(ids)
}
