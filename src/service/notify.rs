//! User-facing notifications.
//!
//! Notifications are fire-and-forget: a notifier never reports failure back
//! to the engine.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Severity shown with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Warning,
    Error,
}

/// Events surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// The script parsed without errors.
    ValidateSuccess,
    /// The execution service response was capped.
    ResponseTruncated { max_bytes: usize },
    /// The execution service failed.
    TimeSeriesError { message: String },
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::ValidateSuccess => NotificationKind::Success,
            Self::ResponseTruncated { .. } => NotificationKind::Warning,
            Self::TimeSeriesError { .. } => NotificationKind::Error,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::ValidateSuccess => "No errors found in script.".to_string(),
            Self::ResponseTruncated { max_bytes } => format!(
                "Large response truncated to first {} MB.",
                max_bytes / 1_000_000
            ),
            Self::TimeSeriesError { message } => format!("Could not get data: {}", message),
        }
    }
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver its notifications arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(notification);
    }
}

/// Writes notifications to the log. Used by the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        let message = notification.message();
        match notification.kind() {
            NotificationKind::Success => tracing::info!(%message, "notification"),
            NotificationKind::Warning => tracing::warn!(%message, "notification"),
            NotificationKind::Error => tracing::error!(%message, "notification"),
        }
    }
}
