//! Chat WebSocket wire protocol.
//!
//! Clients send [`InboundFrame`]s; the server turns each one into a
//! [`Message`] whose `sender_id` and `timestamp` are always stamped
//! server-side. Outbound frames are full [`Message`]s serialized as JSON:
//!
//! ```text
//! inbound:  {"type": "chat", "receiver_id": 2, "content": "hello"}
//! outbound: {"type": "chat", "sender_id": 1, "receiver_id": 2,
//!            "content": "hello", "timestamp": 1760000000}
//! ```

use serde::{Deserialize, Serialize};

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

/// Discriminator carried in the `"type"` field of every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// User-to-user text message. The only persisted type.
    #[default]
    Chat,
    /// Client keep-alive. Routed like any other frame, never persisted.
    Heartbeat,
    /// Server notification: someone sent you a friend request.
    FriendRequest,
    /// Server notification: your friend request was accepted.
    FriendAccept,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Chat => "chat",
            MessageType::Heartbeat => "heartbeat",
            MessageType::FriendRequest => "friend_request",
            MessageType::FriendAccept => "friend_accept",
        }
    }

    /// Parse a wire type string. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chat" => Some(MessageType::Chat),
            "heartbeat" => Some(MessageType::Heartbeat),
            "friend_request" => Some(MessageType::FriendRequest),
            "friend_accept" => Some(MessageType::FriendAccept),
            _ => None,
        }
    }

    /// Only chat messages are written to the history store.
    pub fn is_persisted(self) -> bool {
        matches!(self, MessageType::Chat)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A fully-stamped message as routed by the server and sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub sender_id: DbId,
    pub receiver_id: DbId,
    pub content: String,
    /// Unix seconds, assigned by the server at receipt time.
    pub timestamp: i64,
}

impl Message {
    /// Build a message stamped with the current server time.
    pub fn new(
        kind: MessageType,
        sender_id: DbId,
        receiver_id: DbId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            sender_id,
            receiver_id,
            content: content.into(),
            timestamp: crate::types::unix_now(),
        }
    }

    /// Notification telling `target` that `requester` wants to be friends.
    /// The request note travels as the content.
    pub fn friend_request(requester: DbId, target: DbId, note: &str) -> Self {
        Self::new(MessageType::FriendRequest, requester, target, note)
    }

    /// Notification telling `requester` that `accepter` accepted.
    pub fn friend_accept(accepter: DbId, requester: DbId) -> Self {
        Self::new(
            MessageType::FriendAccept,
            accepter,
            requester,
            FRIEND_ACCEPT_CONTENT,
        )
    }
}

/// Content of the `friend_accept` notification.
pub const FRIEND_ACCEPT_CONTENT: &str = "Your friend request was accepted";

// ---------------------------------------------------------------------------
// Inbound frames
// ---------------------------------------------------------------------------

/// Errors produced while decoding an inbound frame.
///
/// The router treats every variant as a connection close.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

/// A frame as sent by a client.
///
/// `sender_id` and `timestamp` are not part of this struct: if a client
/// includes them they are ignored like any other unknown field.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub receiver_id: DbId,
    #[serde(default)]
    pub content: String,
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Stamp the frame with the authenticated sender and receipt time.
    ///
    /// An absent or empty `type` becomes [`MessageType::Chat`].
    pub fn into_message(self, sender_id: DbId, timestamp: i64) -> Result<Message, ProtocolError> {
        let kind = match self.kind.as_deref() {
            None | Some("") => MessageType::Chat,
            Some(other) => {
                MessageType::parse(other).ok_or_else(|| ProtocolError::UnknownType(other.into()))?
            }
        };

        Ok(Message {
            kind,
            sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            timestamp,
        })
    }
}

/// Decode a text frame received on `sender_id`'s connection.
pub fn decode_inbound(text: &str, sender_id: DbId, timestamp: i64) -> Result<Message, ProtocolError> {
    InboundFrame::parse(text)?.into_message(sender_id, timestamp)
}
