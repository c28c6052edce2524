// mise/src/remote.rs

//! Contracts for the remote marketplace API and the collaborators the view hands work to.
//! Transport is up to the implementor.

use crate::error::MiseResult;
use crate::model::{ChefDetail, ConnectionAction, ConnectionRequest, MealPaymentStatus, OrderId, ServiceOrder};
use crate::resolver::ChefCard;
use async_trait::async_trait;

/// Remote operations the engine consumes.
///
/// Implementations report a missing resource as `MiseError::NotFound`, a
/// refused request as `MiseError::Rejected` (with the server's reason when
/// one was given) and network/server trouble as `MiseError::Transient`.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
  async fn list_service_orders(&self) -> MiseResult<Vec<ServiceOrder>>;

  async fn get_service_order(&self, id: &OrderId) -> MiseResult<ServiceOrder>;

  async fn cancel_service_order(&self, id: &OrderId) -> MiseResult<()>;

  async fn get_chef_public_profile(&self, chef_id: &str) -> MiseResult<ChefDetail>;

  async fn list_connections(&self) -> MiseResult<Vec<ConnectionRequest>>;

  async fn transition_connection(&self, id: &str, action: ConnectionAction) -> MiseResult<()>;

  async fn get_meal_order_payment_status(
    &self,
    order_id: &OrderId,
    session_id: Option<&str>,
  ) -> MiseResult<MealPaymentStatus>;
}

/// The shopping-cart collaborator that finishes checkout of an existing order.
#[async_trait]
pub trait CartHandoff: Send + Sync {
  /// Loads the order into the cart. Returns `false` if the customer declined
  /// (e.g. refused to replace the current cart contents).
  async fn load_existing_order(&self, order: &ServiceOrder, chef: &ChefCard) -> bool;

  async fn open_cart(&self);
}
