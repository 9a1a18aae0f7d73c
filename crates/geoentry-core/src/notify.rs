// ── User notifications ──
//
// Mutation outcomes are surfaced as toasts on a broadcast channel. Sending
// with no subscribers is not an error.

use tokio::sync::broadcast;
use tracing::trace;

pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Toast>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(ToastLevel::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(ToastLevel::Error, message.into());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.tx.subscribe()
    }

    fn send(&self, level: ToastLevel, message: String) {
        trace!(%level, %message, "toast");
        let _ = self.tx.send(Toast { level, message });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_CAPACITY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_toasts_in_order() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier.success("Device created");
        notifier.error("Failed to delete location");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.level, ToastLevel::Success);
        assert_eq!(first.message, "Device created");
        assert_eq!(rx.recv().await.unwrap().level, ToastLevel::Error);
    }

    #[test]
    fn sending_without_subscribers_is_silent() {
        Notifier::new(0).success("nobody listening");
    }
}
