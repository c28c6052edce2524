// mise/src/lib.rs

//! Mise: order and connection reconciliation for a chef marketplace client.
//!
//! The server owns every order's and connection's true state; this crate keeps
//! a client-side picture of it that survives reloads, several open instances
//! and the round trip through an external payment page. It provides:
//!  - An order-id ledger persisted in a shared key/value store, used to
//!    rehydrate orders when the server list comes back empty.
//!  - Chef identity resolution over heterogeneous payloads, with a
//!    deduplicated per-session profile cache.
//!  - An order store whose loads apply atomically and heal the ledger.
//!  - A bounded payment poller (fixed attempts and interval) with an explicit
//!    per-order state machine and resumable pending-payment markers.
//!  - A connection manager with a global busy guard and refetch-after-action.
//!
//! Remote calls go through [`MarketplaceApi`]; user notices go through
//! [`Notifier`]; cart handoff goes through [`CartHandoff`].

pub mod connections;
pub mod core;
pub mod error;
pub mod ledger;
pub mod markers;
pub mod model;
pub mod orders;
pub mod poller;
pub mod remote;
pub mod resolver;
pub mod storage;
pub mod view;

// --- Re-exports for the Public API ---

pub use crate::core::{LoadOutcome, Liveness, Notifier, Tone, ViewState};
pub use crate::error::{MiseError, MiseResult};

pub use crate::connections::{BusyState, ConnectionBoard, ConnectionGroups, ConnectionManager};
pub use crate::ledger::{OrderLedger, LEDGER_KEY};
pub use crate::markers::{CheckoutRedirect, PaymentMarkers, PendingPayment};
pub use crate::model::{
  ChefDetail, ConnectionAction, ConnectionRequest, ConnectionStatus, MealOrder, MealPaymentStatus, OrderId,
  OrderStatus, Party, Record, Schedule, ServiceOrder,
};
pub use crate::orders::{LoadPhase, OrderBook, OrderRow, OrderStore, Reload};
pub use crate::poller::{PaymentPoller, PollConfig, PollOutcome, PollState};
pub use crate::remote::{CartHandoff, MarketplaceApi};
pub use crate::resolver::{ChefCard, ChefResolver, GENERIC_CHEF_LABEL};
pub use crate::storage::{FileStore, KeyValueStore, MemoryStore, StorageEvent, StoreHandle};
pub use crate::view::{MountReport, OrdersView, ViewConfig};
