// mise/src/model/order.rs

use crate::error::{MiseError, MiseResult};
use crate::model::record::{first_bool, first_text, first_u32, into_object, FieldRule, JsonMap, Record};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Server-assigned order identifier. Numeric ids are kept in their decimal text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
  pub fn new(id: impl Into<String>) -> Self {
    OrderId(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for OrderId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for OrderId {
  fn from(s: &str) -> Self {
    OrderId(s.to_string())
  }
}

impl From<String> for OrderId {
  fn from(s: String) -> Self {
    OrderId(s)
  }
}

/// Booking status as reported by the server.
///
/// Legal progression is `{Draft, AwaitingPayment} -> {Confirmed | Cancelled | Refunded | Completed}`.
/// The client only ever reads this value; it never assigns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderStatus {
  Draft,
  AwaitingPayment,
  Confirmed,
  Cancelled,
  Refunded,
  Completed,
  /// A status this client does not know. Neither payable nor terminal.
  Other(String),
}

impl OrderStatus {
  pub fn parse(raw: &str) -> Self {
    match raw.trim().to_ascii_lowercase().as_str() {
      "draft" => OrderStatus::Draft,
      "awaiting_payment" | "pending_payment" | "payment_pending" => OrderStatus::AwaitingPayment,
      "confirmed" => OrderStatus::Confirmed,
      "cancelled" | "canceled" => OrderStatus::Cancelled,
      "refunded" => OrderStatus::Refunded,
      "completed" => OrderStatus::Completed,
      other => OrderStatus::Other(other.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      OrderStatus::Draft => "draft",
      OrderStatus::AwaitingPayment => "awaiting_payment",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Cancelled => "cancelled",
      OrderStatus::Refunded => "refunded",
      OrderStatus::Completed => "completed",
      OrderStatus::Other(s) => s.as_str(),
    }
  }

  /// Draft and awaiting-payment orders can still be paid or cancelled by the customer.
  pub fn is_payable(&self) -> bool {
    matches!(self, OrderStatus::Draft | OrderStatus::AwaitingPayment)
  }

  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      OrderStatus::Confirmed | OrderStatus::Cancelled | OrderStatus::Refunded | OrderStatus::Completed
    )
  }

  /// True when moving from `previous` to `self` goes backwards along the lifecycle.
  pub fn regresses_from(&self, previous: &OrderStatus) -> bool {
    previous.is_terminal() && !self.is_terminal()
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for OrderStatus {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for OrderStatus {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(OrderStatus::parse(&raw))
  }
}

/// When the service takes place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
  Slot { date: NaiveDate, start: Option<NaiveTime> },
  Preference { notes: String },
  Unspecified,
}

const ORDER_ID_RULES: &[FieldRule] = &[
  FieldRule::new("id", &["id"]),
  FieldRule::new("order_id", &["order_id"]),
  FieldRule::new("orderId", &["orderId"]),
];

const STATUS_RULES: &[FieldRule] = &[
  FieldRule::new("status", &["status"]),
  FieldRule::new("order_status", &["order_status"]),
];

const SCHEDULE_DATE_RULES: &[FieldRule] = &[
  FieldRule::new("service_date", &["service_date"]),
  FieldRule::new("scheduled_date", &["scheduled_date"]),
  FieldRule::new("event_date", &["event_date"]),
  FieldRule::new("schedule.date", &["schedule", "date"]),
  FieldRule::new("date", &["date"]),
];

const SCHEDULE_TIME_RULES: &[FieldRule] = &[
  FieldRule::new("service_start_time", &["service_start_time"]),
  FieldRule::new("start_time", &["start_time"]),
  FieldRule::new("schedule.start_time", &["schedule", "start_time"]),
  FieldRule::new("time", &["time"]),
];

const SCHEDULE_NOTES_RULES: &[FieldRule] = &[
  FieldRule::new("schedule_preferences", &["schedule_preferences"]),
  FieldRule::new("preferred_schedule", &["preferred_schedule"]),
  FieldRule::new("schedule.notes", &["schedule", "notes"]),
  FieldRule::new("schedule_notes", &["schedule_notes"]),
];

const TOTAL_RULES: &[FieldRule] = &[
  FieldRule::new("total_value", &["total_value"]),
  FieldRule::new("total_price", &["total_price"]),
  FieldRule::new("total", &["total"]),
  FieldRule::new("amount", &["amount"]),
];

const CURRENCY_RULES: &[FieldRule] = &[
  FieldRule::new("currency", &["currency"]),
  FieldRule::new("currency_code", &["currency_code"]),
];

const REQUESTS_RULES: &[FieldRule] = &[
  FieldRule::new("special_requests", &["special_requests"]),
  FieldRule::new("notes_for_chef", &["notes_for_chef"]),
];

const SUBSCRIPTION_RULES: &[FieldRule] = &[
  FieldRule::new("is_subscription", &["is_subscription"]),
  FieldRule::new("subscription", &["subscription"]),
];

const HOUSEHOLD_RULES: &[FieldRule] = &[
  FieldRule::new("household_size", &["household_size"]),
  FieldRule::new("number_of_people", &["number_of_people"]),
  FieldRule::new("guests", &["guests"]),
];

/// One booked chef service. Chef reference fields stay in `raw` for the resolver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceOrder {
  pub id: OrderId,
  pub status: OrderStatus,
  pub schedule: Schedule,
  pub total_value: Option<String>,
  pub currency: Option<String>,
  pub special_requests: Option<String>,
  pub is_subscription: bool,
  pub household_size: Option<u32>,
  #[serde(skip)]
  pub raw: JsonMap,
}

impl ServiceOrder {
  /// Builds an order from whatever shape the server sent. Only an id is mandatory;
  /// a missing status is read as `Other("unknown")`.
  pub fn from_record(value: Value) -> MiseResult<Self> {
    let raw = into_object(value, "service order")?;
    let id = first_text(ORDER_ID_RULES, &raw)
      .map(OrderId::from)
      .ok_or_else(|| MiseError::Decode("service order without an id".to_string()))?;
    let status = first_text(STATUS_RULES, &raw)
      .map(|s| OrderStatus::parse(&s))
      .unwrap_or_else(|| OrderStatus::Other("unknown".to_string()));

    Ok(Self {
      id,
      status,
      schedule: extract_schedule(&raw),
      total_value: first_text(TOTAL_RULES, &raw),
      currency: first_text(CURRENCY_RULES, &raw).map(|c| c.to_ascii_uppercase()),
      special_requests: first_text(REQUESTS_RULES, &raw),
      is_subscription: first_bool(SUBSCRIPTION_RULES, &raw).unwrap_or(false),
      household_size: first_u32(HOUSEHOLD_RULES, &raw),
      raw,
    })
  }
}

impl Record for ServiceOrder {
  fn fields(&self) -> &JsonMap {
    &self.raw
  }
}

impl<'de> Deserialize<'de> for ServiceOrder {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    ServiceOrder::from_record(value).map_err(serde::de::Error::custom)
  }
}

pub fn extract_schedule(fields: &JsonMap) -> Schedule {
  if let Some(date) = first_text(SCHEDULE_DATE_RULES, fields).and_then(|d| parse_date(&d)) {
    let start = first_text(SCHEDULE_TIME_RULES, fields).and_then(|t| parse_time(&t));
    return Schedule::Slot { date, start };
  }
  match first_text(SCHEDULE_NOTES_RULES, fields) {
    Some(notes) => Schedule::Preference { notes },
    None => Schedule::Unspecified,
  }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok().map(|dt| dt.date()))
    .or_else(|| raw.get(..10).and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()))
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
  NaiveTime::parse_from_str(raw, "%H:%M:%S")
    .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
    .ok()
}
