//! Notifier that keeps every notification in memory.

use std::sync::Mutex;

use sitehub_core::traits::notifier::{Notification, NotificationLevel, Notifier};

/// Records notifications for later inspection.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    received: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    /// Create an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far, oldest first.
    pub fn all(&self) -> Vec<Notification> {
        self.received.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Received notifications of one level.
    pub fn of_level(&self, level: NotificationLevel) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| n.level == level)
            .collect()
    }

    /// Forget everything received.
    pub fn clear(&self) {
        self.received.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }
}
