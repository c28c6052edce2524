// mise_orders/src/config.rs

use crate::errors::{AppError, Result}; // Use AppError specific Result
use dotenvy::dotenv;
use mise::PollConfig;
use reqwest::Url;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_STATE_PATH: &str = "./mise-state.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)] // Clone is useful if parts of config are passed around
pub struct AppConfig {
  /// Always ends with `/` so endpoint paths join beneath it.
  pub api_base_url: Url,
  pub api_token: Option<String>,
  pub state_path: PathBuf,
  pub poll: PollConfig,
  pub http_timeout: Duration,
  /// Query string the payment provider redirected back with, if any.
  pub checkout_redirect: Option<String>,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    let config = Self::from_lookup(|name| env::var(name).ok())?;

    tracing::info!(
      api_base_url = %config.api_base_url,
      state_path = %config.state_path.display(),
      poll_max_attempts = config.poll.max_attempts,
      "Application configuration loaded successfully."
    );
    // The API token is never logged.
    Ok(config)
  }

  /// Reads every setting through `lookup`, so parsing can be exercised without touching the process env.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let raw_base = get("MISE_API_BASE_URL")
      .ok_or_else(|| AppError::Config("Missing environment variable 'MISE_API_BASE_URL'".to_string()))?;
    let api_base_url = parse_base_url(&raw_base)?;

    let defaults = PollConfig::default();
    let max_attempts = match get("MISE_POLL_MAX_ATTEMPTS") {
      Some(raw) => parse_number::<u32>("MISE_POLL_MAX_ATTEMPTS", &raw)?,
      None => defaults.max_attempts,
    };
    if max_attempts == 0 {
      return Err(AppError::Config("MISE_POLL_MAX_ATTEMPTS must be at least 1".to_string()));
    }
    let interval = match get("MISE_POLL_INTERVAL_MS") {
      Some(raw) => Duration::from_millis(parse_number::<u64>("MISE_POLL_INTERVAL_MS", &raw)?),
      None => defaults.interval,
    };
    let http_timeout = Duration::from_secs(match get("MISE_HTTP_TIMEOUT_SECS") {
      Some(raw) => parse_number::<u64>("MISE_HTTP_TIMEOUT_SECS", &raw)?,
      None => DEFAULT_HTTP_TIMEOUT_SECS,
    });

    Ok(Self {
      api_base_url,
      api_token: get("MISE_API_TOKEN"),
      state_path: get("MISE_STATE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
      poll: PollConfig { max_attempts, interval },
      http_timeout,
      checkout_redirect: get("MISE_CHECKOUT_REDIRECT"),
    })
  }
}

fn parse_base_url(raw: &str) -> Result<Url> {
  let mut url = Url::parse(raw).map_err(|e| AppError::Config(format!("Invalid MISE_API_BASE_URL: {}", e)))?;
  if !matches!(url.scheme(), "http" | "https") {
    return Err(AppError::Config(format!(
      "MISE_API_BASE_URL must be http or https, got '{}'",
      url.scheme()
    )));
  }
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  Ok(url)
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  raw
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}
