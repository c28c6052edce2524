// mise/src/connections.rs

//! Customer/chef relationship requests and the accept/decline/end actions on them.
//!
//! Status is never changed locally: a successful action triggers a full
//! refetch, because ending a connection can cascade into server-side changes
//! (e.g. cancelled orders) that the client cannot predict.

use crate::core::{Liveness, Notifier, Tone, ViewState};
use crate::error::{MiseError, MiseResult};
use crate::model::{ConnectionAction, ConnectionRequest, ConnectionStatus, Party};
use crate::orders::LoadPhase;
use crate::remote::MarketplaceApi;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const RESPOND_FAILED_MESSAGE: &str = "We couldn't update this connection. Please try again.";
pub const NOT_ALLOWED_MESSAGE: &str = "This connection can't be updated that way anymore.";

/// Whether an action is currently in flight. One at a time across all connections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BusyState {
  #[default]
  Idle,
  Responding { connection_id: String, action: ConnectionAction },
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionBoard {
  pub connections: Vec<ConnectionRequest>,
  pub phase: LoadPhase,
}

impl ConnectionBoard {
  pub fn get(&self, id: &str) -> Option<&ConnectionRequest> {
    self.connections.iter().find(|c| c.id == id)
  }
}

/// Connections split the way the viewer acts on them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionGroups {
  /// Pending requests the viewer sent; the viewer can only withdraw (decline) them.
  pub sent: Vec<ConnectionRequest>,
  /// Pending requests from the other side; the viewer can accept or decline.
  pub received: Vec<ConnectionRequest>,
  pub active: Vec<ConnectionRequest>,
  pub past: Vec<ConnectionRequest>,
}

pub struct ConnectionManager {
  api: Arc<dyn MarketplaceApi>,
  notifier: Arc<dyn Notifier>,
  viewer: Party,
  board: ViewState<ConnectionBoard>,
  busy: Mutex<BusyState>,
  liveness: Liveness,
}

/// Returns the manager to `Idle` however `respond` exits.
struct BusyGuard<'a> {
  busy: &'a Mutex<BusyState>,
}

impl Drop for BusyGuard<'_> {
  fn drop(&mut self) {
    *self.busy.lock() = BusyState::Idle;
  }
}

impl ConnectionManager {
  pub fn new(api: Arc<dyn MarketplaceApi>, notifier: Arc<dyn Notifier>, viewer: Party, liveness: Liveness) -> Self {
    Self {
      api,
      notifier,
      viewer,
      board: ViewState::default(),
      busy: Mutex::new(BusyState::Idle),
      liveness,
    }
  }

  pub fn board(&self) -> ConnectionBoard {
    self.board.snapshot()
  }

  pub fn busy_state(&self) -> BusyState {
    self.busy.lock().clone()
  }

  /// Actions the viewer may take on `connection` in its current status.
  pub fn available_actions(&self, connection: &ConnectionRequest) -> Vec<ConnectionAction> {
    match &connection.status {
      ConnectionStatus::Pending if connection.is_initiated_by(self.viewer) => vec![ConnectionAction::Decline],
      ConnectionStatus::Pending => vec![ConnectionAction::Accept, ConnectionAction::Decline],
      ConnectionStatus::Accepted => vec![ConnectionAction::End],
      _ => Vec::new(),
    }
  }

  pub fn groups(&self) -> ConnectionGroups {
    let board = self.board.read();
    let mut groups = ConnectionGroups::default();
    for connection in &board.connections {
      let bucket = match &connection.status {
        ConnectionStatus::Pending if connection.is_initiated_by(self.viewer) => &mut groups.sent,
        ConnectionStatus::Pending => &mut groups.received,
        ConnectionStatus::Accepted => &mut groups.active,
        _ => &mut groups.past,
      };
      bucket.push(connection.clone());
    }
    groups
  }

  /// Replaces the board with the server's list. On failure the old list stays.
  #[instrument(name = "ConnectionManager::refresh", skip(self))]
  pub async fn refresh(&self) -> MiseResult<()> {
    self.board.update(|b| b.phase = LoadPhase::Loading);
    let result = self.api.list_connections().await;
    if !self.liveness.is_alive() {
      return result.map(|_| ());
    }
    match result {
      Ok(connections) => {
        debug!(count = connections.len(), "connections refreshed");
        self.board.update(|b| {
          b.connections = connections;
          b.phase = LoadPhase::Ready;
        });
        Ok(())
      }
      Err(e) => {
        warn!(error = %e, "connection list request failed, keeping previous list");
        self.board.update(|b| b.phase = LoadPhase::Failed { message: e.to_string() });
        Err(e)
      }
    }
  }

  /// Asks the server to apply `action` to `connection_id`.
  ///
  /// Rejected without any network call while another action is in flight, or
  /// when the locally known status does not allow the action. On server
  /// failure the notification carries the server's reason when it gave one.
  #[instrument(name = "ConnectionManager::respond", skip(self), fields(%action))]
  pub async fn respond(&self, connection_id: &str, action: ConnectionAction) -> MiseResult<()> {
    let known = self.board.read().get(connection_id).cloned();
    if let Some(connection) = &known {
      if !self.available_actions(connection).contains(&action) {
        self.notify(NOT_ALLOWED_MESSAGE, Tone::Error);
        return Err(MiseError::IllegalTransition {
          action: action.to_string(),
          from: connection.status.to_string(),
        });
      }
    }

    let _guard = {
      let mut busy = self.busy.lock();
      if let BusyState::Responding { connection_id: busy_with, .. } = &*busy {
        debug!(%busy_with, "another connection action is in flight");
        return Err(MiseError::Busy {
          busy_with: busy_with.clone(),
        });
      }
      *busy = BusyState::Responding {
        connection_id: connection_id.to_string(),
        action,
      };
      BusyGuard { busy: &self.busy }
    };

    match self.api.transition_connection(connection_id, action).await {
      Ok(()) => {
        info!(connection_id, "connection action accepted by server");
        if let Err(e) = self.refresh().await {
          debug!(error = %e, "refetch after action failed");
        }
        self.notify(action.success_message(), Tone::Success);
        Ok(())
      }
      Err(e) => {
        let message = e.server_detail().unwrap_or(RESPOND_FAILED_MESSAGE).to_string();
        warn!(connection_id, error = %e, "connection action failed");
        self.notify(&message, Tone::Error);
        Err(MiseError::ActionFailed {
          action: action.to_string(),
          message,
        })
      }
    }
  }

  fn notify(&self, text: &str, tone: Tone) {
    if self.liveness.is_alive() {
      self.notifier.notify(text, tone);
    }
  }
}
