// mise/src/model/record.rs

//! Ordered, named extraction rules over heterogeneous JSON payloads.
//!
//! Upstream payloads spell the same concept many ways (`chef_id`, `chef.id`,
//! `chef.user.id`, ...). Every concept gets an explicit rule list; rules are
//! tried in order and the first usable value wins. Absent or unusable fields
//! are skipped silently.

use serde_json::Value;

pub type JsonMap = serde_json::Map<String, Value>;

/// One lookup path into a payload, e.g. `["chef", "user", "id"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
  pub name: &'static str,
  pub path: &'static [&'static str],
}

impl FieldRule {
  pub const fn new(name: &'static str, path: &'static [&'static str]) -> Self {
    Self { name, path }
  }

  pub fn lookup<'a>(&self, fields: &'a JsonMap) -> Option<&'a Value> {
    let (first, rest) = self.path.split_first()?;
    let mut current = fields.get(*first)?;
    for segment in rest {
      current = current.as_object()?.get(*segment)?;
    }
    Some(current)
  }

  pub fn text(&self, fields: &JsonMap) -> Option<String> {
    self.lookup(fields).and_then(normalize_text)
  }
}

/// Strings are trimmed and must be non-empty; numbers are rendered as text.
pub fn normalize_text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => {
      let trimmed = s.trim();
      (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// First rule yielding usable text, together with the rule that matched.
pub fn first_match(rules: &[FieldRule], fields: &JsonMap) -> Option<(FieldRule, String)> {
  rules.iter().find_map(|rule| rule.text(fields).map(|text| (*rule, text)))
}

pub fn first_text(rules: &[FieldRule], fields: &JsonMap) -> Option<String> {
  first_match(rules, fields).map(|(_, text)| text)
}

pub fn first_bool(rules: &[FieldRule], fields: &JsonMap) -> Option<bool> {
  rules.iter().find_map(|rule| match rule.lookup(fields)? {
    Value::Bool(b) => Some(*b),
    Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
      "true" | "yes" | "1" => Some(true),
      "false" | "no" | "0" => Some(false),
      _ => None,
    },
    Value::Number(n) => n.as_i64().map(|v| v != 0),
    _ => None,
  })
}

pub fn first_u32(rules: &[FieldRule], fields: &JsonMap) -> Option<u32> {
  rules.iter().find_map(|rule| match rule.lookup(fields)? {
    Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
    Value::String(s) => s.trim().parse::<u32>().ok(),
    _ => None,
  })
}

/// Anything the resolver can scan.
pub trait Record {
  fn fields(&self) -> &JsonMap;
}

impl Record for JsonMap {
  fn fields(&self) -> &JsonMap {
    self
  }
}

pub(crate) fn into_object(value: Value, what: &str) -> Result<JsonMap, crate::error::MiseError> {
  match value {
    Value::Object(map) => Ok(map),
    other => Err(crate::error::MiseError::Decode(format!(
      "expected {what} object, got {}",
      json_kind(&other)
    ))),
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
