// mise_orders/src/services/mod.rs

pub mod cart_console;
pub mod marketplace_http;
pub mod notify_log;

pub use cart_console::ConsoleCart;
pub use marketplace_http::HttpMarketplaceApi;
pub use notify_log::TracingNotifier;
