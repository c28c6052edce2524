// mise/src/markers.rs

//! Single-value markers that let a later mount resume payment polling after
//! the checkout redirect, plus parsing of the redirect itself.

use crate::error::MiseResult;
use crate::model::OrderId;
use crate::storage::StoreHandle;
use tracing::warn;
use url::Url;

pub const LAST_PAYMENT_ORDER_KEY: &str = "mise.last_payment_order_id";
pub const LAST_CHECKOUT_SESSION_KEY: &str = "mise.last_checkout_session_id";

/// An order whose payment outcome has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPayment {
  pub order_id: OrderId,
  pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentMarkers {
  store: StoreHandle,
}

impl PaymentMarkers {
  pub fn new(store: StoreHandle) -> Self {
    Self { store }
  }

  /// Called right before handing the customer to the payment provider.
  pub fn record(&self, order_id: &OrderId, session_id: Option<&str>) {
    let result = self.store.set(LAST_PAYMENT_ORDER_KEY, order_id.as_str()).and_then(|_| match session_id {
      Some(session) => self.store.set(LAST_CHECKOUT_SESSION_KEY, session),
      None => self.store.remove(LAST_CHECKOUT_SESSION_KEY),
    });
    if let Err(e) = result {
      warn!(%order_id, error = %e, "payment marker not stored");
    }
  }

  pub fn pending(&self) -> Option<PendingPayment> {
    match self.read() {
      Ok(pending) => pending,
      Err(e) => {
        warn!(error = %e, "payment marker unreadable");
        None
      }
    }
  }

  pub fn clear(&self) {
    let result = self
      .store
      .remove(LAST_PAYMENT_ORDER_KEY)
      .and_then(|_| self.store.remove(LAST_CHECKOUT_SESSION_KEY));
    if let Err(e) = result {
      warn!(error = %e, "payment marker not cleared");
    }
  }

  /// Clears the markers only if they still point at `order_id`; a newer checkout keeps its marker.
  pub fn clear_for(&self, order_id: &OrderId) {
    if self.pending().is_some_and(|p| &p.order_id == order_id) {
      self.clear();
    }
  }

  fn read(&self) -> MiseResult<Option<PendingPayment>> {
    let order_id = self
      .store
      .get(LAST_PAYMENT_ORDER_KEY)?
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty());
    let Some(order_id) = order_id else {
      return Ok(None);
    };
    let session_id = self
      .store
      .get(LAST_CHECKOUT_SESSION_KEY)?
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty());
    Ok(Some(PendingPayment {
      order_id: OrderId::from(order_id),
      session_id,
    }))
  }
}

/// Query parameters the payment provider appends when sending the customer back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRedirect {
  pub session_id: String,
  pub order_id: Option<OrderId>,
}

impl CheckoutRedirect {
  /// Accepts `session_id=..&order_id=..`, the same with a leading `?`, or a full URL.
  /// Returns `None` when there is no session token.
  pub fn from_query(input: &str) -> Option<Self> {
    let input = input.trim();
    let query = if input.contains("://") {
      Url::parse(input).ok()?.query()?.to_string()
    } else {
      input.trim_start_matches('?').to_string()
    };

    let mut session_id = None;
    let mut order_id = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
      let value = value.trim();
      if value.is_empty() {
        continue;
      }
      match key.as_ref() {
        "session_id" | "checkout_session_id" => session_id = Some(value.to_string()),
        "order_id" | "meal_order_id" => order_id = Some(OrderId::from(value)),
        _ => {}
      }
    }
    session_id.map(|session_id| Self { session_id, order_id })
  }

  /// The order to poll: explicit in the redirect, else the stored marker.
  pub fn target(&self, markers: &PaymentMarkers) -> Option<PendingPayment> {
    let order_id = self.order_id.clone().or_else(|| markers.pending().map(|p| p.order_id))?;
    Some(PendingPayment {
      order_id,
      session_id: Some(self.session_id.clone()),
    })
  }
}
