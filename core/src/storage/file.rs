// mise/src/storage/file.rs

use crate::error::{MiseError, MiseResult};
use crate::storage::{KeyValueStore, StorageEvent, UpdateFn, EVENT_BUFFER_CAPACITY};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Key/value store persisted as one JSON object on disk.
///
/// Every mutation rewrites the document through a sibling temp file and a
/// rename, so a crash leaves either the old or the new document.
pub struct FileStore {
  path: PathBuf,
  write_lock: Mutex<()>,
  events: broadcast::Sender<StorageEvent>,
}

type Document = BTreeMap<String, String>;

impl FileStore {
  pub fn open(path: impl Into<PathBuf>) -> Self {
    let (events, _) = broadcast::channel(EVENT_BUFFER_CAPACITY);
    Self {
      path: path.into(),
      write_lock: Mutex::new(()),
      events,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn read_document(&self) -> MiseResult<Document> {
    match fs::read_to_string(&self.path) {
      Ok(text) if text.trim().is_empty() => Ok(Document::new()),
      Ok(text) => serde_json::from_str(&text)
        .map_err(|e| MiseError::Storage(format!("corrupt store at {}: {}", self.path.display(), e))),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
      Err(e) => Err(MiseError::Storage(format!("cannot read {}: {}", self.path.display(), e))),
    }
  }

  fn write_document(&self, document: &Document) -> MiseResult<()> {
    if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent)
        .map_err(|e| MiseError::Storage(format!("cannot create {}: {}", parent.display(), e)))?;
    }
    let body = serde_json::to_string_pretty(document)?;
    let tmp = self.path.with_extension("tmp");
    fs::write(&tmp, body).map_err(|e| MiseError::Storage(format!("cannot write {}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, &self.path)
      .map_err(|e| MiseError::Storage(format!("cannot replace {}: {}", self.path.display(), e)))
  }

  /// Reads, changes and rewrites the document while holding the write lock.
  fn mutate(
    &self,
    key: &str,
    origin: Uuid,
    apply: impl FnOnce(&mut Document) -> MiseResult<bool>,
  ) -> MiseResult<bool> {
    let _guard = self.write_lock.lock();
    let mut document = self.read_document()?;
    if !apply(&mut document)? {
      return Ok(false);
    }
    self.write_document(&document)?;
    debug!(key, "store document rewritten");
    let _ = self.events.send(StorageEvent {
      key: key.to_string(),
      origin,
    });
    Ok(true)
  }
}

impl KeyValueStore for FileStore {
  fn get(&self, key: &str) -> MiseResult<Option<String>> {
    Ok(self.read_document()?.get(key).cloned())
  }

  #[instrument(skip(self, value), fields(path = %self.path.display()))]
  fn set(&self, key: &str, value: &str, origin: Uuid) -> MiseResult<()> {
    self
      .mutate(key, origin, |doc| {
        Ok(doc.insert(key.to_string(), value.to_string()).as_deref() != Some(value))
      })
      .map(|_| ())
  }

  #[instrument(skip(self), fields(path = %self.path.display()))]
  fn remove(&self, key: &str, origin: Uuid) -> MiseResult<()> {
    self.mutate(key, origin, |doc| Ok(doc.remove(key).is_some())).map(|_| ())
  }

  #[instrument(skip(self, apply), fields(path = %self.path.display()))]
  fn update(&self, key: &str, origin: Uuid, apply: &mut UpdateFn<'_>) -> MiseResult<bool> {
    self.mutate(key, origin, |doc| match apply(doc.get(key).cloned())? {
      Some(next) if doc.get(key) != Some(&next) => {
        doc.insert(key.to_string(), next);
        Ok(true)
      }
      _ => Ok(false),
    })
  }

  fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
    self.events.subscribe()
  }
}
