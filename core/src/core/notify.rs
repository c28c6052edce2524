// mise/src/core/notify.rs

//! The fire-and-forget notification channel shared by the order and connection components.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
  Success,
  Info,
  Error,
}

impl fmt::Display for Tone {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      Tone::Success => "success",
      Tone::Info => "info",
      Tone::Error => "error",
    };
    f.write_str(label)
  }
}

/// Receiver of user-facing notices (toasts). Implementations must not block.
pub trait Notifier: Send + Sync {
  fn notify(&self, text: &str, tone: Tone);
}
