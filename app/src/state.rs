// mise_orders/src/state.rs
use crate::config::AppConfig;
use crate::errors::Result as AppResult;
use crate::services::{ConsoleCart, HttpMarketplaceApi, TracingNotifier};
use mise::{FileStore, OrdersView, Party, ViewConfig};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>, // Share loaded config
  pub view: OrdersView,
}

impl AppState {
  /// Wires the HTTP remote, the file-backed store and the headless collaborators into one view.
  pub fn build(config: Arc<AppConfig>) -> AppResult<Self> {
    let api = Arc::new(HttpMarketplaceApi::new(&config)?);
    let storage = Arc::new(FileStore::open(config.state_path.clone()));
    let view = OrdersView::new(
      api,
      storage,
      Arc::new(TracingNotifier),
      Arc::new(ConsoleCart { auto_confirm: true }),
      ViewConfig {
        poll: config.poll,
        viewer: Party::Customer,
      },
    );
    Ok(Self { config, view })
  }
}
