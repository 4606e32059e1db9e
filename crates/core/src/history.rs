//! Chat history: the persisted projection of chat messages and the
//! pagination rules for querying it.

use async_trait::async_trait;
use serde::Serialize;

use crate::message::{Message, MessageType};
use crate::store::StoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Pagination constants
// ---------------------------------------------------------------------------

/// Page used when the caller does not specify one.
pub const DEFAULT_PAGE: i64 = 1;

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Deadline for a single history write.
pub const HISTORY_WRITE_TIMEOUT_SECS: u64 = 5;

/// Deadline for a single history query (count + page).
pub const HISTORY_READ_TIMEOUT_SECS: u64 = 10;

/// Validate a `(page, page_size)` pair, applying defaults for missing values.
///
/// Returns the effective pair, or a human-readable reason.
pub fn validate_pagination(
    page: Option<i64>,
    page_size: Option<i64>,
) -> Result<(i64, i64), String> {
    let page = page.unwrap_or(DEFAULT_PAGE);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);

    if page < 1 {
        return Err(format!("page must be >= 1, got {page}"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(format!(
            "page_size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
        ));
    }
    Ok((page, page_size))
}

/// Number of rows to skip for a validated `(page, page_size)` pair.
pub fn page_offset(page: i64, page_size: i64) -> i64 {
    (page - 1).saturating_mul(page_size)
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A chat message as stored, with its store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub id: DbId,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub sender_id: DbId,
    pub receiver_id: DbId,
    pub content: String,
    pub timestamp: i64,
}

/// Insert DTO: a chat message that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub kind: MessageType,
    pub sender_id: DbId,
    pub receiver_id: DbId,
    pub content: String,
    pub timestamp: i64,
}

impl NewChatMessage {
    /// Project a routed message into a history record.
    ///
    /// Returns `None` for types that are never persisted.
    pub fn from_message(msg: &Message) -> Option<Self> {
        if !msg.kind.is_persisted() {
            return None;
        }
        Some(Self {
            kind: msg.kind,
            sender_id: msg.sender_id,
            receiver_id: msg.receiver_id,
            content: msg.content.clone(),
            timestamp: msg.timestamp,
        })
    }
}

/// One page of a conversation, newest first, plus the conversation size.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub messages: Vec<ChatMessage>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Append-only chat log.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a chat message, returning the stored record.
    async fn save(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError>;

    /// Messages exchanged between `user_a` and `user_b` in either direction,
    /// ordered by timestamp descending (ties broken by id descending).
    ///
    /// `page` and `page_size` must already be validated with
    /// [`validate_pagination`].
    async fn find_between(
        &self,
        user_a: DbId,
        user_b: DbId,
        page: i64,
        page_size: i64,
    ) -> Result<HistoryPage, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        assert_eq!(validate_pagination(None, None), Ok((1, 50)));
        assert_eq!(validate_pagination(Some(3), None), Ok((3, 50)));
    }

    #[test]
    fn pagination_bounds() {
        assert!(validate_pagination(Some(0), None).is_err());
        assert!(validate_pagination(Some(-1), None).is_err());
        assert!(validate_pagination(None, Some(0)).is_err());
        assert!(validate_pagination(None, Some(101)).is_err());
        assert_eq!(validate_pagination(None, Some(100)), Ok((1, 100)));
        assert_eq!(validate_pagination(None, Some(1)), Ok((1, 1)));
    }

    #[test]
    fn offsets() {
        assert_eq!(page_offset(1, 50), 0);
        assert_eq!(page_offset(3, 50), 100);
    }

    #[test]
    fn only_chat_messages_project() {
        let chat = Message {
            kind: MessageType::Chat,
            sender_id: 1,
            receiver_id: 2,
            content: "hi".into(),
            timestamp: 10,
        };
        let projected = NewChatMessage::from_message(&chat).unwrap();
        assert_eq!(projected.sender_id, 1);
        assert_eq!(projected.timestamp, 10);

        let beat = Message {
            kind: MessageType::Heartbeat,
            ..chat
        };
        assert!(NewChatMessage::from_message(&beat).is_none());
    }
}
