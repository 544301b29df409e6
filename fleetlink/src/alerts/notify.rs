//! In-process alert notification channel.
//!
//! Consumers that do not poll the session subscribe here to react to new
//! alerts as they are accepted or created.

use tokio::sync::broadcast;

use super::model::Alert;

/// Capacity of the notification channel. Slow receivers lag, senders never block.
pub const NOTIFICATION_CAPACITY: usize = 64;

/// A notification about an accepted or created alert.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertNotification {
    /// A local SOS alert recorded because the report could not be sent.
    SosEmergency(Alert),
    /// An alert received over the live connection.
    NewAlert(Alert),
}

impl AlertNotification {
    /// Event name, as dashboards know it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SosEmergency(_) => "sosEmergency",
            Self::NewAlert(_) => "newAlert",
        }
    }

    /// The alert carried by this notification.
    pub fn alert(&self) -> &Alert {
        match self {
            Self::SosEmergency(alert) | Self::NewAlert(alert) => alert,
        }
    }
}

/// Publisher side of the notification channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<AlertNotification>,
}

impl Notifier {
    /// Create a notifier with the default capacity.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self { tx }
    }

    /// Subscribe to notifications emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AlertNotification> {
        self.tx.subscribe()
    }

    /// Emit a notification. Returns the number of receivers reached.
    pub fn emit(&self, notification: AlertNotification) -> usize {
        let name = notification.name();
        let id = notification.alert().id.clone();
        match self.tx.send(notification) {
            Ok(receivers) => {
                tracing::debug!(event = name, alert_id = %id, receivers, "Alert notification sent");
                receivers
            }
            Err(_) => {
                tracing::trace!(event = name, alert_id = %id, "No alert subscribers");
                0
            }
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
