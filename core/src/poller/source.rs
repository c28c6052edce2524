// mise/src/poller/source.rs

//! Where a poll attempt reads payment status from.

use crate::error::MiseResult;
use crate::markers::PendingPayment;
use crate::model::{MealOrder, OrderId, OrderStatus};
use crate::remote::MarketplaceApi;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// What one status request revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentProbe {
  pub paid: bool,
  pub status: String,
}

/// How a probe moves the poll forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
  Succeeded,
  StillPayable,
  /// Neither paid nor payable: cancelled, refunded or otherwise settled elsewhere.
  ResolvedElsewhere,
}

/// Statuses that mean the payment went through.
pub const SUCCESS_STATUSES: &[&str] = &["confirmed", "completed", "paid"];

impl PaymentProbe {
  /// An empty status carries no information and keeps the poll going.
  pub fn verdict(&self) -> Verdict {
    let status = self.status.trim().to_ascii_lowercase();
    if self.paid || SUCCESS_STATUSES.contains(&status.as_str()) {
      return Verdict::Succeeded;
    }
    if status.is_empty() || OrderStatus::parse(&status).is_payable() {
      Verdict::StillPayable
    } else {
      Verdict::ResolvedElsewhere
    }
  }
}

#[async_trait]
pub trait PaymentStatusSource: Send + Sync {
  fn name(&self) -> &'static str;

  async fn probe(&self, pending: &PendingPayment) -> MiseResult<PaymentProbe>;
}

/// Reads the meal-order payment endpoint, passing the checkout session when known.
/// Keeps the last observation of each meal order.
pub struct MealPaymentSource {
  api: Arc<dyn MarketplaceApi>,
  observed: Mutex<HashMap<OrderId, MealOrder>>,
}

impl MealPaymentSource {
  pub fn new(api: Arc<dyn MarketplaceApi>) -> Self {
    Self {
      api,
      observed: Mutex::new(HashMap::new()),
    }
  }

  pub fn meal_order(&self, id: &OrderId) -> Option<MealOrder> {
    self.observed.lock().get(id).cloned()
  }
}

#[async_trait]
impl PaymentStatusSource for MealPaymentSource {
  fn name(&self) -> &'static str {
    "meal_order_payment"
  }

  async fn probe(&self, pending: &PendingPayment) -> MiseResult<PaymentProbe> {
    let reported = self
      .api
      .get_meal_order_payment_status(&pending.order_id, pending.session_id.as_deref())
      .await?;
    let probe = PaymentProbe {
      paid: reported.paid,
      status: reported.status.clone(),
    };
    self
      .observed
      .lock()
      .entry(pending.order_id.clone())
      .or_insert_with(|| MealOrder::new(pending.order_id.clone(), pending.session_id.clone()))
      .observe(&reported);
    Ok(probe)
  }
}

/// Reads the service order itself; a booking has no separate paid flag.
pub struct ServiceOrderSource {
  api: Arc<dyn MarketplaceApi>,
}

impl ServiceOrderSource {
  pub fn new(api: Arc<dyn MarketplaceApi>) -> Self {
    Self { api }
  }
}

#[async_trait]
impl PaymentStatusSource for ServiceOrderSource {
  fn name(&self) -> &'static str {
    "service_order"
  }

  async fn probe(&self, pending: &PendingPayment) -> MiseResult<PaymentProbe> {
    let order = self.api.get_service_order(&pending.order_id).await?;
    Ok(PaymentProbe {
      paid: false,
      status: order.status.as_str().to_string(),
    })
  }
}
