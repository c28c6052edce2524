// mise_orders/src/main.rs

// Declare modules for the application
mod config;
mod errors;
mod services;
mod state;

use crate::config::AppConfig;
use crate::errors::{AppError, Result as AppResult}; // Use the app's Result alias
use crate::state::AppState;

use mise::{CheckoutRedirect, LoadOutcome, OrdersView};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing

#[tokio::main]
async fn main() -> AppResult<()> {
  // Initialize tracing subscriber for logging
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO) // Default level
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE) // Log when spans close, showing duration
    .init();

  tracing::info!("Starting customer orders watcher...");

  // Load application configuration
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg), // Arc the config for sharing
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(e);
    }
  };

  // A redirect passed on the command line wins over the configured one.
  let raw_redirect = std::env::args().nth(1).or_else(|| app_config.checkout_redirect.clone());
  let redirect = raw_redirect.as_deref().and_then(|raw| {
    let parsed = CheckoutRedirect::from_query(raw);
    if parsed.is_none() {
      tracing::warn!(redirect = raw, "Ignoring checkout redirect without a session id.");
    }
    parsed
  });

  let app_state = AppState::build(app_config)?;
  let view = app_state.view.clone();

  let report = view.mount(redirect).await;
  match &report.load {
    LoadOutcome::Failed => {
      let book = view.orders();
      tracing::warn!(
        reason = book.retryable_error().unwrap_or("unknown"),
        "Orders could not be loaded; try again later."
      );
    }
    outcome => tracing::info!(?outcome, "Orders loaded."),
  }
  print_orders(&view);
  print_connections(&view);

  // Pick up orders recorded by other instances while a payment is being confirmed.
  view.watch_ledger();

  if let Some((order_id, poll)) = report.poll {
    tracing::info!(%order_id, "Waiting for payment confirmation...");
    let outcome = poll.await.map_err(AppError::from)?;
    match outcome.as_error(&order_id) {
      Some(notice) => tracing::warn!(%notice, "Payment still pending; it will be checked again next run."),
      None => tracing::info!(?outcome, "Payment poll finished."),
    }
    print_orders(&view);
  }

  view.teardown();
  tracing::info!(
    state_path = %app_state.config.state_path.display(),
    "Customer orders watcher finished."
  );
  Ok(())
}

fn print_orders(view: &OrdersView) {
  let rows = view.rows();
  if rows.is_empty() {
    tracing::info!("No orders yet.");
    return;
  }
  for row in rows {
    tracing::info!(
      order_id = %row.order.id,
      status = %row.order.status,
      schedule = ?row.order.schedule,
      chef = %row.chef.display_name,
      profile = row.chef.profile_path.as_deref().unwrap_or("-"),
      "Order"
    );
  }
}

fn print_connections(view: &OrdersView) {
  let groups = view.connection_groups();
  for (label, list) in [
    ("received", &groups.received),
    ("sent", &groups.sent),
    ("active", &groups.active),
    ("past", &groups.past),
  ] {
    for connection in list {
      let actions: Vec<&str> = view
        .connections()
        .available_actions(connection)
        .iter()
        .map(|a| a.as_str())
        .collect();
      tracing::info!(
        group = label,
        connection_id = %connection.id,
        status = %connection.status,
        actions = ?actions,
        "Connection"
      );
    }
  }
}
