pub mod control;
pub mod notify;
pub mod view_state;

pub use control::{LoadOutcome, Liveness};
pub use notify::{Notifier, Tone};
pub use view_state::ViewState;
