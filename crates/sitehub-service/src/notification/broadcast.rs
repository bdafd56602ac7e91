//! Notifier fanning notifications out to any number of subscribers.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use sitehub_core::traits::notifier::{Notification, NotificationLevel, Notifier};

/// Publishes notifications on a tokio broadcast channel.
///
/// Each notification is also logged, so nothing is lost when no
/// subscriber is attached.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    /// Create a notifier whose subscribers buffer up to `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error | NotificationLevel::Warning => {
                warn!(title = %notification.title, message = %notification.message, "Notification")
            }
            _ => info!(title = %notification.title, message = %notification.message, "Notification"),
        }
        if self.sender.send(notification).is_err() {
            debug!("No notification subscribers");
        }
    }
}
