//! Transient user-facing notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// A mutation succeeded.
    Success,
    /// A mutation failed.
    Error,
    /// Something degraded but the operation went through.
    Warning,
    /// Informational.
    Info,
}

/// A transient notification (toast).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Short title.
    pub title: String,
    /// Human-readable detail. Never an internal error code.
    pub message: String,
    /// When the notification was raised.
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Create a notification stamped now.
    pub fn new(level: NotificationLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Success notification.
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, title, message)
    }

    /// Error notification.
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, title, message)
    }

    /// Warning notification.
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, title, message)
    }
}

/// Sink for transient notifications.
pub trait Notifier: Send + Sync + std::fmt::Debug + 'static {
    /// Publish a notification.
    fn notify(&self, notification: Notification);
}
