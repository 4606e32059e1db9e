//! Real-time notifications for relation state changes.
//!
//! Each transition produces exactly one message, handed to the presence
//! registry on a detached task so the HTTP response never waits on a
//! socket write. Offline recipients simply miss it.

use std::sync::Arc;

use polychat_core::message::Message;

use crate::presence::PresenceRegistry;

pub fn notify(presence: &Arc<PresenceRegistry>, message: Message) {
    let presence = Arc::clone(presence);
    tokio::spawn(async move {
        tracing::debug!(
            kind = %message.kind,
            sender_id = message.sender_id,
            receiver_id = message.receiver_id,
            "Sending notification"
        );
        presence.deliver(&message).await;
    });
}
