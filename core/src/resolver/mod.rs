// mise/src/resolver/mod.rs

//! Chef identity resolution: canonical id, display name and profile path for
//! any order or connection record, backed by a per-session profile cache.

pub mod rules;

use crate::error::MiseError;
use crate::model::{ChefDetail, Record};
use crate::remote::MarketplaceApi;
use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

pub use rules::{resolve_chef_id, resolve_display_name, resolve_profile_path, sanitize_profile_url};

/// Label shown when no usable chef name exists anywhere.
pub const GENERIC_CHEF_LABEL: &str = "Your chef";

/// Display data for the chef behind one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChefCard {
  pub chef_id: Option<String>,
  pub display_name: String,
  pub profile_path: Option<String>,
}

type DetailSlot = Arc<OnceCell<Option<ChefDetail>>>;

/// Resolves chef identity and caches public profiles for the session.
///
/// Cache entries are append-only; `Some(None)` from [`ChefResolver::cached`]
/// means "looked up, not found". Each chef id has one slot, and a slot runs
/// at most one lookup at a time; concurrent callers for the same id wait on
/// that lookup instead of issuing their own. Transient failures leave the slot
/// empty so a later call may try again.
pub struct ChefResolver {
  api: Arc<dyn MarketplaceApi>,
  slots: Mutex<HashMap<String, DetailSlot>>,
}

impl ChefResolver {
  pub fn new(api: Arc<dyn MarketplaceApi>) -> Self {
    Self {
      api,
      slots: Mutex::new(HashMap::new()),
    }
  }

  /// `None` if never resolved; `Some(None)` if resolved as not found.
  pub fn cached(&self, chef_id: &str) -> Option<Option<ChefDetail>> {
    self.slots.lock().get(chef_id).and_then(|slot| slot.get().cloned())
  }

  #[instrument(name = "ChefResolver::fetch_detail", skip(self))]
  pub async fn fetch_detail(&self, chef_id: &str) -> Option<ChefDetail> {
    let chef_id = chef_id.trim();
    if chef_id.is_empty() {
      return None;
    }
    let slot = self.slots.lock().entry(chef_id.to_string()).or_default().clone();

    let api = Arc::clone(&self.api);
    let outcome = slot
      .get_or_try_init(|| async move {
        match api.get_chef_public_profile(chef_id).await {
          Ok(detail) => Ok(Some(detail)),
          Err(MiseError::NotFound { .. }) => {
            debug!("chef profile not found, caching negative result");
            Ok(None)
          }
          Err(MiseError::Decode(reason)) => {
            warn!(%reason, "chef profile unreadable, caching negative result");
            Ok(None)
          }
          Err(e) => Err(e),
        }
      })
      .await;

    match outcome {
      Ok(detail) => detail.clone(),
      Err(e) => {
        warn!(error = %e, "chef profile lookup failed, will retry on next request");
        None
      }
    }
  }

  /// Looks up every distinct id concurrently; ids already resolved cost nothing.
  pub async fn prefetch<I>(&self, chef_ids: I)
  where
    I: IntoIterator<Item = String>,
  {
    let distinct: BTreeSet<String> = chef_ids
      .into_iter()
      .map(|id| id.trim().to_string())
      .filter(|id| !id.is_empty() && self.cached(id).is_none())
      .collect();
    if distinct.is_empty() {
      return;
    }
    debug!(count = distinct.len(), "prefetching chef profiles");
    join_all(distinct.iter().map(|id| self.fetch_detail(id))).await;
  }

  /// Builds the card from the record and whatever the cache holds. Never performs I/O.
  pub fn card_for(&self, record: &dyn Record) -> ChefCard {
    let chef_id = resolve_chef_id(record);
    let detail = chef_id.as_deref().and_then(|id| self.cached(id)).flatten();
    let display_name =
      resolve_display_name(record, detail.as_ref()).unwrap_or_else(|| GENERIC_CHEF_LABEL.to_string());
    let profile_path = resolve_profile_path(record, detail.as_ref(), chef_id.as_deref());
    ChefCard {
      chef_id,
      display_name,
      profile_path,
    }
  }
}
