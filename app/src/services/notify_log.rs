// mise_orders/src/services/notify_log.rs

use mise::{Notifier, Tone};
use tracing::{event, Level};

/// Headless stand-in for toasts: every notice becomes a log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  fn notify(&self, text: &str, tone: Tone) {
    match tone {
      Tone::Success | Tone::Info => event!(target: "mise_orders::notice", Level::INFO, %tone, "{}", text),
      Tone::Error => event!(target: "mise_orders::notice", Level::WARN, %tone, "{}", text),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_tone_is_logged_under_the_notice_target() {
    let subscriber = tracing_subscriber::fmt()
      .with_max_level(Level::INFO)
      .with_test_writer()
      .finish();
    tracing::subscriber::with_default(subscriber, || {
      let notifier = TracingNotifier;
      notifier.notify("Payment confirmed.", Tone::Success);
      notifier.notify("Still waiting on the payment provider.", Tone::Info);
      notifier.notify("Connection not found", Tone::Error);
    });
  }
}
