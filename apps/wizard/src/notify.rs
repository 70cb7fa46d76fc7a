use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A final user-facing outcome message (what the UI shows as a snackbar).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: Option<String>,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: None,
            message: message.into(),
        }
    }

    pub fn error(title: &str, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: Some(title.to_string()),
            message: message.into(),
        }
    }
}

/// Where outcome messages go. Delivery is up to the implementation.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Logs every notification and keeps them for the response being built.
#[derive(Debug, Default)]
pub struct NotificationBuffer {
    items: Mutex<Vec<Notification>>,
}

impl NotificationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.items.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for NotificationBuffer {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => info!("notify: {}", notification.message),
            NotificationLevel::Error => warn!("notify: {}", notification.message),
        }
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_drains_in_order() {
        let buffer = NotificationBuffer::new();
        buffer.notify(Notification::error("Unexpected Error", "Failed to save resume"));
        buffer.notify(Notification::success("Resume created successfully"));

        let drained = buffer.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].level, NotificationLevel::Error);
        assert_eq!(drained[1].message, "Resume created successfully");
        assert!(buffer.drain().is_empty());
    }
}
