//! Chat history row model.

use polychat_core::history::ChatMessage;
use polychat_core::message::MessageType;
use polychat_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `chat_messages` table.
#[derive(Debug, Clone, FromRow)]
pub struct ChatMessageRow {
    pub id: DbId,
    pub message_type: String,
    pub sender_id: DbId,
    pub receiver_id: DbId,
    pub content: String,
    pub sent_at: i64,
    pub created_at: Timestamp,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = String;

    fn try_from(row: ChatMessageRow) -> Result<Self, Self::Error> {
        let kind = MessageType::parse(&row.message_type).ok_or_else(|| {
            format!(
                "chat message {} has unknown type '{}'",
                row.id, row.message_type
            )
        })?;
        Ok(ChatMessage {
            id: row.id,
            kind,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            content: row.content,
            timestamp: row.sent_at,
        })
    }
}
