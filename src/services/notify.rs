//! Fire-and-forget user notifications.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub event: String,
    pub payload: serde_json::Value,
}

/// Outbound notification channel. Delivery failures are never surfaced to
/// the caller.
pub trait Notifier: Send + Sync {
    fn notify_user(&self, user_id: Uuid, event: &str, payload: serde_json::Value);
}

/// In-process registry of live connections per user.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<Uuid, Vec<mpsc::UnboundedSender<Notification>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new connection for `user_id`. The connection closes when the
    /// receiver is dropped.
    pub fn register_connection(&self, user_id: Uuid) -> mpsc::UnboundedReceiver<Notification> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        connections.entry(user_id).or_default().push(tx);
        rx
    }

    /// Deliver to every live connection of `user_id`, pruning closed ones.
    /// Returns how many connections received the notification.
    pub fn broadcast(&self, user_id: Uuid, notification: Notification) -> usize {
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        let Some(senders) = connections.get_mut(&user_id) else {
            return 0;
        };

        senders.retain(|tx| tx.send(notification.clone()).is_ok());
        let delivered = senders.len();
        if delivered == 0 {
            connections.remove(&user_id);
        }
        delivered
    }

    pub fn connection_count(&self, user_id: Uuid) -> usize {
        let connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        connections.get(&user_id).map(Vec::len).unwrap_or(0)
    }
}

impl Notifier for ConnectionRegistry {
    fn notify_user(&self, user_id: Uuid, event: &str, payload: serde_json::Value) {
        let delivered = self.broadcast(
            user_id,
            Notification {
                event: event.to_string(),
                payload,
            },
        );

        if delivered == 0 {
            tracing::debug!(user_id = %user_id, event, "No live connection for notification");
        }
    }
}
