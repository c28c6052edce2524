// mise/src/model/meal.rs

use crate::model::order::OrderId;
use serde::{Deserialize, Serialize};

/// Payment status of a standalone meal purchase, as returned by the payment-status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPaymentStatus {
  #[serde(default)]
  pub paid: bool,
  #[serde(default)]
  pub status: String,
  #[serde(default, alias = "sessionStatus")]
  pub session_status: Option<String>,
}

/// Client-side view of a meal order. Every field is a read of server truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealOrder {
  pub id: OrderId,
  pub payment_session_id: Option<String>,
  pub paid: bool,
  pub status: Option<String>,
  pub session_status: Option<String>,
}

impl MealOrder {
  pub fn new(id: OrderId, payment_session_id: Option<String>) -> Self {
    Self {
      id,
      payment_session_id,
      paid: false,
      status: None,
      session_status: None,
    }
  }

  /// Replaces the observed fields with what the server just reported.
  pub fn observe(&mut self, reported: &MealPaymentStatus) {
    self.paid = reported.paid;
    self.status = Some(reported.status.clone()).filter(|s| !s.is_empty());
    self.session_status = reported.session_status.clone();
  }
}
