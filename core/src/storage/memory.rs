// mise/src/storage/memory.rs

use crate::error::{MiseError, MiseResult};
use crate::storage::{KeyValueStore, StorageEvent, UpdateFn, EVENT_BUFFER_CAPACITY};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Process-local store. Several `StoreHandle`s over one `MemoryStore` behave
/// like several tabs over the same origin storage.
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
  events: broadcast::Sender<StorageEvent>,
  available: AtomicBool,
}

impl MemoryStore {
  pub fn new() -> Self {
    let (events, _) = broadcast::channel(EVENT_BUFFER_CAPACITY);
    Self {
      entries: Mutex::new(HashMap::new()),
      events,
      available: AtomicBool::new(true),
    }
  }

  /// Makes every operation fail, as storage does in private browsing or when quota is exceeded.
  pub fn set_available(&self, available: bool) {
    self.available.store(available, Ordering::SeqCst);
  }

  fn ensure_available(&self) -> MiseResult<()> {
    if self.available.load(Ordering::SeqCst) {
      Ok(())
    } else {
      Err(MiseError::Storage("memory store marked unavailable".to_string()))
    }
  }

  fn announce(&self, key: &str, origin: Uuid) {
    // No subscribers is fine.
    let _ = self.events.send(StorageEvent {
      key: key.to_string(),
      origin,
    });
  }
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> MiseResult<Option<String>> {
    self.ensure_available()?;
    Ok(self.entries.lock().get(key).cloned())
  }

  fn set(&self, key: &str, value: &str, origin: Uuid) -> MiseResult<()> {
    self.ensure_available()?;
    self.entries.lock().insert(key.to_string(), value.to_string());
    self.announce(key, origin);
    Ok(())
  }

  fn remove(&self, key: &str, origin: Uuid) -> MiseResult<()> {
    self.ensure_available()?;
    let removed = self.entries.lock().remove(key).is_some();
    if removed {
      self.announce(key, origin);
    }
    Ok(())
  }

  fn update(&self, key: &str, origin: Uuid, apply: &mut UpdateFn<'_>) -> MiseResult<bool> {
    self.ensure_available()?;
    let written = {
      let mut entries = self.entries.lock();
      match apply(entries.get(key).cloned())? {
        Some(next) if entries.get(key) != Some(&next) => {
          entries.insert(key.to_string(), next);
          true
        }
        _ => false,
      }
    };
    if written {
      self.announce(key, origin);
    }
    Ok(written)
  }

  fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
    self.events.subscribe()
  }
}
