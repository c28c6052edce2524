// mise_orders/src/services/marketplace_http.rs

use crate::config::AppConfig;
use crate::errors::Result as AppResult;
use async_trait::async_trait;
use mise::{
  ChefDetail, ConnectionAction, ConnectionRequest, MarketplaceApi, MealPaymentStatus, MiseError, MiseResult, OrderId,
  ServiceOrder,
};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, instrument, warn};

const CUSTOMER_ORDERS_PATH: &str = "services/my/customer-orders/";
const SERVICE_ORDER_PATH: &str = "services/orders/";
const CHEF_PROFILE_PATH: &str = "chefs/api/public/";
const CONNECTIONS_PATH: &str = "services/connections/";
const MEAL_ORDERS_PATH: &str = "meals/api/meal-orders/";

/// Collection envelopes the API wraps lists in.
const LIST_ENVELOPE_KEYS: &[&str] = &["results", "orders", "connections", "data", "items"];

/// `MarketplaceApi` over the marketplace's JSON REST endpoints.
#[derive(Clone)]
pub struct HttpMarketplaceApi {
  base: Url,
  token: Option<String>,
  client: reqwest::Client,
}

impl fmt::Debug for HttpMarketplaceApi {
  fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    formatter
      .debug_struct("HttpMarketplaceApi")
      .field("base", &self.base.as_str())
      .field("token", &self.token.as_ref().map(|_| "<redacted>"))
      .finish()
  }
}

impl HttpMarketplaceApi {
  pub fn new(config: &AppConfig) -> AppResult<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("mise_orders/", env!("CARGO_PKG_VERSION")))
      .timeout(config.http_timeout)
      .build()?;
    Ok(Self {
      base: config.api_base_url.clone(),
      token: config.api_token.clone(),
      client,
    })
  }

  /// `collection` joined under the base, then each segment percent-encoded, with a trailing slash.
  fn endpoint(&self, collection: &str, segments: &[&str]) -> MiseResult<Url> {
    let mut url = self
      .base
      .join(collection)
      .map_err(|e| MiseError::Internal(format!("cannot build endpoint '{collection}': {e}")))?;
    if !segments.is_empty() {
      let mut path = url
        .path_segments_mut()
        .map_err(|_| MiseError::Internal(format!("base URL {} cannot carry a path", self.base)))?;
      path.pop_if_empty();
      for segment in segments {
        path.push(segment.trim());
      }
      path.push("");
    }
    Ok(url)
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    let builder = self.client.request(method, url).header("Accept", "application/json");
    match &self.token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    }
  }

  /// Sends the request and returns the body of a 2xx response.
  async fn send(&self, request: RequestBuilder, resource: &str) -> MiseResult<String> {
    let response = request
      .send()
      .await
      .map_err(|err| MiseError::Transient(format!("failed to reach marketplace API for {resource}: {err}")))?;
    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|err| MiseError::Transient(format!("failed to read response for {resource}: {err}")))?;

    if !status.is_success() {
      debug!(%status, resource, "marketplace API returned an error status");
      return Err(classify_failure(status, &body, resource));
    }
    Ok(body)
  }

  async fn get_value(&self, url: Url, resource: &str) -> MiseResult<Value> {
    let body = self.send(self.request(Method::GET, url), resource).await?;
    parse_body(&body)
  }

  async fn get_typed<T: DeserializeOwned>(&self, url: Url, resource: &str) -> MiseResult<T> {
    let body = self.send(self.request(Method::GET, url), resource).await?;
    serde_json::from_str(&body).map_err(|e| MiseError::Decode(format!("{resource}: {e}")))
  }

  async fn post(&self, url: Url, payload: Option<Value>, resource: &str) -> MiseResult<()> {
    let request = self.request(Method::POST, url);
    let request = match payload {
      Some(payload) => request.json(&payload),
      None => request,
    };
    self.send(request, resource).await.map(|_| ())
  }
}

#[async_trait]
impl MarketplaceApi for HttpMarketplaceApi {
  #[instrument(skip(self))]
  async fn list_service_orders(&self) -> MiseResult<Vec<ServiceOrder>> {
    let url = self.endpoint(CUSTOMER_ORDERS_PATH, &[])?;
    let value = self.get_value(url, "customer orders").await?;
    Ok(decode_rows(list_items(value)?, "order", ServiceOrder::from_record))
  }

  #[instrument(skip(self), fields(%id))]
  async fn get_service_order(&self, id: &OrderId) -> MiseResult<ServiceOrder> {
    let url = self.endpoint(SERVICE_ORDER_PATH, &[id.as_str()])?;
    let value = self.get_value(url, &format!("order {id}")).await?;
    ServiceOrder::from_record(value)
  }

  #[instrument(skip(self), fields(%id))]
  async fn cancel_service_order(&self, id: &OrderId) -> MiseResult<()> {
    let url = self.endpoint(SERVICE_ORDER_PATH, &[id.as_str(), "cancel"])?;
    self.post(url, None, &format!("order {id}")).await
  }

  #[instrument(skip(self))]
  async fn get_chef_public_profile(&self, chef_id: &str) -> MiseResult<ChefDetail> {
    let url = self.endpoint(CHEF_PROFILE_PATH, &[chef_id])?;
    let value = self.get_value(url, &format!("chef {chef_id}")).await?;
    ChefDetail::from_value(value)
  }

  #[instrument(skip(self))]
  async fn list_connections(&self) -> MiseResult<Vec<ConnectionRequest>> {
    let url = self.endpoint(CONNECTIONS_PATH, &[])?;
    let value = self.get_value(url, "connections").await?;
    Ok(decode_rows(list_items(value)?, "connection", ConnectionRequest::from_record))
  }

  #[instrument(skip(self), fields(%action))]
  async fn transition_connection(&self, id: &str, action: ConnectionAction) -> MiseResult<()> {
    let url = self.endpoint(CONNECTIONS_PATH, &[id, "respond"])?;
    self
      .post(url, Some(json!({ "action": action.as_str() })), &format!("connection {id}"))
      .await
  }

  #[instrument(skip(self), fields(%order_id, has_session = session_id.is_some()))]
  async fn get_meal_order_payment_status(
    &self,
    order_id: &OrderId,
    session_id: Option<&str>,
  ) -> MiseResult<MealPaymentStatus> {
    let mut url = self.endpoint(MEAL_ORDERS_PATH, &[order_id.as_str(), "payment-status"])?;
    if let Some(session_id) = session_id {
      url.query_pairs_mut().append_pair("session_id", session_id);
    }
    self.get_typed(url, &format!("meal order {order_id}")).await
  }
}

/// Maps a non-2xx response onto the engine's error taxonomy.
///
/// 404 is `NotFound`; 408, 429 and 5xx are `Transient`; any other status is
/// `Rejected`. `NotFound` and `Rejected` keep the server's reason when the
/// body carries one.
pub(crate) fn classify_failure(status: StatusCode, body: &str, resource: &str) -> MiseError {
  if status == StatusCode::NOT_FOUND {
    return MiseError::not_found_with_detail(resource, server_detail(body));
  }
  if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS {
    return MiseError::Transient(format!("HTTP {} for {}: {}", status, resource, truncate_for_error(body)));
  }
  MiseError::Rejected {
    status: status.as_u16(),
    detail: server_detail(body),
  }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  detail: Option<Value>,
  error: Option<Value>,
  message: Option<Value>,
}

/// The human-readable reason in an error body: `detail`, `error` or `message`.
pub(crate) fn server_detail(body: &str) -> Option<String> {
  let parsed: ErrorBody = serde_json::from_str(body).ok()?;
  [parsed.detail, parsed.error, parsed.message]
    .into_iter()
    .flatten()
    .find_map(|value| match value {
      Value::String(text) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
      _ => None,
    })
}

fn parse_body(body: &str) -> MiseResult<Value> {
  if body.trim().is_empty() {
    return Ok(Value::Null);
  }
  serde_json::from_str(body).map_err(|e| MiseError::Decode(format!("response is not JSON: {e}")))
}

/// Accepts a bare array or an object wrapping one under a known key.
pub(crate) fn list_items(value: Value) -> MiseResult<Vec<Value>> {
  match value {
    Value::Array(items) => Ok(items),
    Value::Null => Ok(Vec::new()),
    Value::Object(mut map) => LIST_ENVELOPE_KEYS
      .iter()
      .find_map(|key| match map.remove(*key) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
      })
      .ok_or_else(|| MiseError::Decode("list response without an items array".to_string())),
    other => Err(MiseError::Decode(format!("expected a list, got {other}"))),
  }
}

/// Decodes every row it can. A malformed row is logged and skipped so one bad
/// record does not hide the rest of the list.
pub(crate) fn decode_rows<T>(items: Vec<Value>, kind: &str, decode: impl Fn(Value) -> MiseResult<T>) -> Vec<T> {
  let total = items.len();
  let rows: Vec<T> = items
    .into_iter()
    .enumerate()
    .filter_map(|(index, item)| match decode(item) {
      Ok(row) => Some(row),
      Err(e) => {
        warn!(kind, index, error = %e, "skipping undecodable row");
        None
      }
    })
    .collect();
  if rows.len() < total {
    debug!(kind, kept = rows.len(), total, "list decoded with skipped rows");
  }
  rows
}

fn truncate_for_error(body: &str) -> String {
  const MAX_LEN: usize = 200;
  if body.chars().count() <= MAX_LEN {
    body.to_owned()
  } else {
    format!("{}...", body.chars().take(MAX_LEN).collect::<String>())
  }
}
