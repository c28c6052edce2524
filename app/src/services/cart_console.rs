// mise_orders/src/services/cart_console.rs

use async_trait::async_trait;
use mise::{CartHandoff, ChefCard, ServiceOrder};
use tracing::{info, instrument};

/// Cart handoff for the headless host. There is no customer to ask, so the
/// handoff proceeds when `auto_confirm` is set and is declined otherwise.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleCart {
  pub auto_confirm: bool,
}

#[async_trait]
impl CartHandoff for ConsoleCart {
  #[instrument(skip_all, fields(order_id = %order.id, chef = %chef.display_name))]
  async fn load_existing_order(&self, order: &ServiceOrder, chef: &ChefCard) -> bool {
    info!(
      status = %order.status,
      total = order.total_value.as_deref().unwrap_or("-"),
      currency = order.currency.as_deref().unwrap_or("-"),
      proceed = self.auto_confirm,
      "Loading existing order into cart"
    );
    self.auto_confirm
  }

  async fn open_cart(&self) {
    info!("Cart opened for checkout");
  }
}
