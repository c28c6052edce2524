// mise/src/model/connection.rs

use crate::error::{MiseError, MiseResult};
use crate::model::record::{first_text, into_object, FieldRule, JsonMap, Record};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
  Pending,
  Accepted,
  Declined,
  Ended,
  Other(String),
}

impl ConnectionStatus {
  pub fn parse(raw: &str) -> Self {
    match raw.trim().to_ascii_lowercase().as_str() {
      "pending" | "requested" => ConnectionStatus::Pending,
      "accepted" | "active" => ConnectionStatus::Accepted,
      "declined" | "rejected" => ConnectionStatus::Declined,
      "ended" | "cancelled" | "canceled" => ConnectionStatus::Ended,
      other => ConnectionStatus::Other(other.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      ConnectionStatus::Pending => "pending",
      ConnectionStatus::Accepted => "accepted",
      ConnectionStatus::Declined => "declined",
      ConnectionStatus::Ended => "ended",
      ConnectionStatus::Other(s) => s.as_str(),
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, ConnectionStatus::Declined | ConnectionStatus::Ended)
  }
}

impl fmt::Display for ConnectionStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for ConnectionStatus {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

/// Which side of the relationship created the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
  Customer,
  Chef,
}

impl Party {
  fn parse(raw: &str) -> Option<Self> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "customer" | "user" | "client" => Some(Party::Customer),
      "chef" => Some(Party::Chef),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionAction {
  Accept,
  Decline,
  End,
}

impl ConnectionAction {
  pub fn as_str(&self) -> &'static str {
    match self {
      ConnectionAction::Accept => "accept",
      ConnectionAction::Decline => "decline",
      ConnectionAction::End => "end",
    }
  }

  /// Accept and decline apply to pending requests; end applies to accepted ones.
  pub fn is_legal_from(&self, status: &ConnectionStatus) -> bool {
    match self {
      ConnectionAction::Accept | ConnectionAction::Decline => *status == ConnectionStatus::Pending,
      ConnectionAction::End => *status == ConnectionStatus::Accepted,
    }
  }

  pub fn success_message(&self) -> &'static str {
    match self {
      ConnectionAction::Accept => "Connection accepted",
      ConnectionAction::Decline => "Connection declined",
      ConnectionAction::End => "Connection ended",
    }
  }
}

impl fmt::Display for ConnectionAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

const CONNECTION_ID_RULES: &[FieldRule] = &[
  FieldRule::new("id", &["id"]),
  FieldRule::new("connection_id", &["connection_id"]),
];

const CONNECTION_STATUS_RULES: &[FieldRule] = &[
  FieldRule::new("status", &["status"]),
  FieldRule::new("state", &["state"]),
];

const INITIATOR_RULES: &[FieldRule] = &[
  FieldRule::new("initiated_by", &["initiated_by"]),
  FieldRule::new("initiator", &["initiator"]),
  FieldRule::new("requested_by", &["requested_by"]),
  FieldRule::new("initiator.role", &["initiator", "role"]),
];

/// A customer/chef relationship offer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionRequest {
  pub id: String,
  pub status: ConnectionStatus,
  pub initiator: Party,
  #[serde(skip)]
  pub raw: JsonMap,
}

impl ConnectionRequest {
  /// An unknown initiator is read as the chef, so the customer is offered accept/decline.
  pub fn from_record(value: Value) -> MiseResult<Self> {
    let raw = into_object(value, "connection")?;
    let id = first_text(CONNECTION_ID_RULES, &raw)
      .ok_or_else(|| MiseError::Decode("connection without an id".to_string()))?;
    let status = first_text(CONNECTION_STATUS_RULES, &raw)
      .map(|s| ConnectionStatus::parse(&s))
      .unwrap_or_else(|| ConnectionStatus::Other("unknown".to_string()));
    let initiator = first_text(INITIATOR_RULES, &raw)
      .and_then(|s| Party::parse(&s))
      .unwrap_or(Party::Chef);
    Ok(Self {
      id,
      status,
      initiator,
      raw,
    })
  }

  pub fn is_initiated_by(&self, party: Party) -> bool {
    self.initiator == party
  }
}

impl Record for ConnectionRequest {
  fn fields(&self) -> &JsonMap {
    &self.raw
  }
}

impl<'de> Deserialize<'de> for ConnectionRequest {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    ConnectionRequest::from_record(value).map_err(serde::de::Error::custom)
  }
}
