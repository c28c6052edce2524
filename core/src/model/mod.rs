// mise/src/model/mod.rs

//! Client-side records of server-owned entities.

pub mod chef;
pub mod connection;
pub mod meal;
pub mod order;
pub mod record;

pub use chef::ChefDetail;
pub use connection::{ConnectionAction, ConnectionRequest, ConnectionStatus, Party};
pub use meal::{MealOrder, MealPaymentStatus};
pub use order::{OrderId, OrderStatus, Schedule, ServiceOrder};
pub use record::{FieldRule, JsonMap, Record};
