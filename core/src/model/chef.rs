// mise/src/model/chef.rs

use crate::error::MiseResult;
use crate::model::record::{into_object, JsonMap, Record};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A chef's public profile as returned by the profile endpoint. Shape varies,
/// so it is kept as raw fields and read through resolver rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChefDetail {
  fields: JsonMap,
}

impl ChefDetail {
  /// Accepts either the profile object itself or an envelope `{ "chef": { .. } }`.
  pub fn from_value(value: Value) -> MiseResult<Self> {
    let mut fields = into_object(value, "chef profile")?;
    if fields.len() == 1 && matches!(fields.get("chef"), Some(Value::Object(_))) {
      if let Some(Value::Object(inner)) = fields.remove("chef") {
        return Ok(Self { fields: inner });
      }
    }
    Ok(Self { fields })
  }
}

impl Record for ChefDetail {
  fn fields(&self) -> &JsonMap {
    &self.fields
  }
}

impl<'de> Deserialize<'de> for ChefDetail {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    ChefDetail::from_value(value).map_err(serde::de::Error::custom)
  }
}
