//! Direct message routing between staff.
//!
//! Delivery is fire-once: a message is always created and stored, then
//! pushed exactly once if the recipient has a live handle. There is no
//! retry and no queue for unreachable recipients; an undelivered message
//! simply keeps its delivery marker unset. Messages live in memory only and
//! vanish on restart by design.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use wardlink_core::{Message, Priority};

use crate::events::ServerEvent;
use crate::session::SessionRegistry;

/// Routes direct messages and typing signals through the session registry.
pub struct MessageRouter {
    registry: Arc<SessionRegistry>,
    store: RwLock<HashMap<Uuid, Message>>,
}

impl MessageRouter {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            store: RwLock::new(HashMap::new()),
        }
    }

    /// Send a direct message.
    ///
    /// The message record is created regardless of recipient reachability.
    /// If the recipient has a live handle the message is pushed, the
    /// delivery marker set, and `message-delivered` pushed back to the
    /// sender; otherwise the record stays undelivered and no error is
    /// raised. Per sender-to-recipient order follows the recipient's single
    /// serialized handle.
    pub async fn send(
        &self,
        sender_id: &str,
        recipient_id: &str,
        body: impl Into<String>,
        priority: Priority,
    ) -> Message {
        let mut message = Message::new(sender_id, recipient_id, body, priority);
        self.store.write().insert(message.id, message.clone());

        let Some(recipient) = self.registry.resolve(recipient_id) else {
            tracing::debug!(
                message_id = %message.id,
                recipient_id = %recipient_id,
                "Recipient unreachable, message stays undelivered"
            );
            return message;
        };

        if recipient.push(ServerEvent::MessageReceived(message.clone())).await {
            message.mark_delivered();
            if let Some(stored) = self.store.write().get_mut(&message.id) {
                stored.delivered_at = message.delivered_at;
            }

            if let Some(sender) = self.registry.resolve(sender_id) {
                sender
                    .push(ServerEvent::MessageDelivered {
                        message_id: message.id,
                        to: recipient_id.to_string(),
                    })
                    .await;
            }
        }

        message
    }

    /// Relay a transient typing indicator. Nothing is stored; an offline
    /// recipient is silently skipped.
    pub async fn notify_typing(&self, sender_id: &str, recipient_id: &str, is_typing: bool) {
        if let Some(recipient) = self.registry.resolve(recipient_id) {
            recipient
                .push(ServerEvent::TypingIndicator {
                    from: sender_id.to_string(),
                    is_typing,
                })
                .await;
        }
    }

    /// Look up a stored message record.
    pub fn get(&self, message_id: Uuid) -> Option<Message> {
        self.store.read().get(&message_id).cloned()
    }
}
