// mise/src/storage/mod.rs

//! Durable key/value storage shared by every open instance of the client.
//!
//! Each mutation is persisted before the call returns and announced on a
//! broadcast channel as a [`StorageEvent`]. Events carry the writer's origin
//! so an instance can ignore its own writes, the way a browser tab only
//! hears storage events raised by other tabs.

pub mod file;
pub mod memory;

use crate::error::MiseResult;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

pub use file::FileStore;
pub use memory::MemoryStore;

pub(crate) const EVENT_BUFFER_CAPACITY: usize = 64;

/// Computes the next value of a key from its current one. `Ok(None)` leaves the key untouched.
pub type UpdateFn<'a> = dyn FnMut(Option<String>) -> MiseResult<Option<String>> + 'a;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
  pub key: String,
  pub origin: Uuid,
}

pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> MiseResult<Option<String>>;
  fn set(&self, key: &str, value: &str, origin: Uuid) -> MiseResult<()>;
  fn remove(&self, key: &str, origin: Uuid) -> MiseResult<()>;
  /// Read-modify-write of one key under the store's own lock, so concurrent
  /// writers never lose each other's changes. `apply` runs exactly once.
  /// Returns whether a new value was written.
  fn update(&self, key: &str, origin: Uuid, apply: &mut UpdateFn<'_>) -> MiseResult<bool>;
  fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

/// A store as seen by one client instance.
#[derive(Clone)]
pub struct StoreHandle {
  store: Arc<dyn KeyValueStore>,
  origin: Uuid,
}

impl StoreHandle {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self {
      store,
      origin: Uuid::new_v4(),
    }
  }

  pub fn origin(&self) -> Uuid {
    self.origin
  }

  pub fn get(&self, key: &str) -> MiseResult<Option<String>> {
    self.store.get(key)
  }

  pub fn set(&self, key: &str, value: &str) -> MiseResult<()> {
    self.store.set(key, value, self.origin)
  }

  pub fn remove(&self, key: &str) -> MiseResult<()> {
    self.store.remove(key, self.origin)
  }

  pub fn update(&self, key: &str, apply: &mut UpdateFn<'_>) -> MiseResult<bool> {
    self.store.update(key, self.origin, apply)
  }

  pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
    self.store.subscribe()
  }

  /// True for events on `key` written by some other instance.
  pub fn is_foreign_change(&self, event: &StorageEvent, key: &str) -> bool {
    event.key == key && event.origin != self.origin
  }
}

impl std::fmt::Debug for StoreHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StoreHandle").field("origin", &self.origin).finish()
  }
}
