//! Repository for the `chat_messages` table.

use polychat_core::types::DbId;
use sqlx::PgPool;

use crate::models::chat_message::ChatMessageRow;

/// Column list for `chat_messages` queries.
const COLUMNS: &str =
    "id, message_type, sender_id, receiver_id, content, sent_at, created_at";

/// Filter matching both directions of a conversation between `$1` and `$2`.
const PAIR_FILTER: &str = "(sender_id = $1 AND receiver_id = $2) \
                           OR (sender_id = $2 AND receiver_id = $1)";

/// Append and query operations for chat history.
pub struct ChatMessageRepo;

impl ChatMessageRepo {
    /// Append a message, returning the stored row with its assigned id.
    pub async fn insert(
        pool: &PgPool,
        message_type: &str,
        sender_id: DbId,
        receiver_id: DbId,
        content: &str,
        sent_at: i64,
    ) -> Result<ChatMessageRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO chat_messages (message_type, sender_id, receiver_id, content, sent_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatMessageRow>(&query)
            .bind(message_type)
            .bind(sender_id)
            .bind(receiver_id)
            .bind(content)
            .bind(sent_at)
            .fetch_one(pool)
            .await
    }

    /// One page of the conversation between two users, newest first.
    pub async fn find_between(
        pool: &PgPool,
        user_a: DbId,
        user_b: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChatMessageRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chat_messages \
             WHERE {PAIR_FILTER} \
             ORDER BY sent_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, ChatMessageRow>(&query)
            .bind(user_a)
            .bind(user_b)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Total number of messages exchanged between two users.
    pub async fn count_between(
        pool: &PgPool,
        user_a: DbId,
        user_b: DbId,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM chat_messages WHERE {PAIR_FILTER}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(user_a)
            .bind(user_b)
            .fetch_one(pool)
            .await
    }
}
