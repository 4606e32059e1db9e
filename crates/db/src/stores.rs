//! Postgres implementations of the `polychat-core` store traits.
//!
//! Each store is a thin wrapper over the repositories. Driver errors are
//! mapped to [`StoreError`] here so nothing above this crate sees `sqlx`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use polychat_core::history::{
    page_offset, ChatMessage, HistoryPage, HistoryStore, NewChatMessage,
    HISTORY_READ_TIMEOUT_SECS, HISTORY_WRITE_TIMEOUT_SECS,
};
use polychat_core::relation::{Relation, RelationStore, RelationType};
use polychat_core::store::StoreError;
use polychat_core::types::DbId;
use polychat_core::user::{NewUser, UserAccount, UserStore};

use crate::models::relation::RelationRow;
use crate::repositories::{ChatMessageRepo, RelationRepo, UserRepo};
use crate::{health_check, is_unique_violation, DbPool};

fn map_sqlx(err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

/// Run `fut` under a deadline, mapping expiry to [`StoreError::Timeout`].
async fn with_deadline<T, F>(secs: u64, what: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(Duration::from_secs(secs), fut).await {
        Ok(result) => result.map_err(map_sqlx),
        Err(_) => {
            tracing::warn!(operation = what, timeout_secs = secs, "Store deadline exceeded");
            Err(StoreError::Timeout(what))
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<UserAccount, StoreError> {
        UserRepo::create(
            &self.pool,
            &user.username,
            &user.password_hash,
            user.email.as_deref(),
        )
        .await
        .map(UserAccount::from)
        .map_err(map_sqlx)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<UserAccount>, StoreError> {
        UserRepo::find_by_id(&self.pool, id)
            .await
            .map(|row| row.map(UserAccount::from))
            .map_err(map_sqlx)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        UserRepo::find_by_username(&self.pool, username)
            .await
            .map(|row| row.map(UserAccount::from))
            .map_err(map_sqlx)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await.map_err(map_sqlx)
    }
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgRelationStore {
    pool: DbPool,
}

impl PgRelationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_relations(rows: Vec<RelationRow>) -> Result<Vec<Relation>, StoreError> {
    rows.into_iter()
        .map(|row| Relation::try_from(row).map_err(StoreError::Backend))
        .collect()
}

#[async_trait]
impl RelationStore for PgRelationStore {
    async fn create(&self, relation: &Relation) -> Result<(), StoreError> {
        RelationRepo::create(
            &self.pool,
            relation.owner_id,
            relation.target_id,
            relation.relation_type,
            &relation.note,
        )
        .await
        .map_err(map_sqlx)
    }

    async fn delete_by_pair(&self, owner_id: DbId, target_id: DbId) -> Result<bool, StoreError> {
        RelationRepo::delete_by_pair(&self.pool, owner_id, target_id)
            .await
            .map_err(map_sqlx)
    }

    async fn find_by_owner(&self, owner_id: DbId) -> Result<Vec<Relation>, StoreError> {
        let rows = RelationRepo::find_by_owner(&self.pool, owner_id)
            .await
            .map_err(map_sqlx)?;
        to_relations(rows)
    }

    async fn find_by_pair(
        &self,
        owner_id: DbId,
        target_id: DbId,
    ) -> Result<Option<Relation>, StoreError> {
        RelationRepo::find_by_pair(&self.pool, owner_id, target_id)
            .await
            .map_err(map_sqlx)?
            .map(|row| Relation::try_from(row).map_err(StoreError::Backend))
            .transpose()
    }

    async fn find_pending_by_target(&self, target_id: DbId) -> Result<Vec<Relation>, StoreError> {
        let rows = RelationRepo::find_pending_by_target(&self.pool, target_id)
            .await
            .map_err(map_sqlx)?;
        to_relations(rows)
    }

    async fn update_type(
        &self,
        owner_id: DbId,
        target_id: DbId,
        relation_type: RelationType,
    ) -> Result<bool, StoreError> {
        RelationRepo::update_type(&self.pool, owner_id, target_id, relation_type)
            .await
            .map_err(map_sqlx)
    }

    async fn update_note(
        &self,
        owner_id: DbId,
        target_id: DbId,
        note: &str,
    ) -> Result<bool, StoreError> {
        RelationRepo::update_note(&self.pool, owner_id, target_id, note)
            .await
            .map_err(map_sqlx)
    }

    async fn accept_request(
        &self,
        requester_id: DbId,
        accepter_id: DbId,
    ) -> Result<bool, StoreError> {
        RelationRepo::accept(&self.pool, requester_id, accepter_id)
            .await
            .map_err(map_sqlx)
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgHistoryStore {
    pool: DbPool,
}

impl PgHistoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn save(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError> {
        let row = with_deadline(
            HISTORY_WRITE_TIMEOUT_SECS,
            "history write",
            ChatMessageRepo::insert(
                &self.pool,
                message.kind.as_str(),
                message.sender_id,
                message.receiver_id,
                &message.content,
                message.timestamp,
            ),
        )
        .await?;
        ChatMessage::try_from(row).map_err(StoreError::Backend)
    }

    async fn find_between(
        &self,
        user_a: DbId,
        user_b: DbId,
        page: i64,
        page_size: i64,
    ) -> Result<HistoryPage, StoreError> {
        let pool = &self.pool;
        let (total, rows) = with_deadline(HISTORY_READ_TIMEOUT_SECS, "history read", async {
            let total = ChatMessageRepo::count_between(pool, user_a, user_b).await?;
            let rows = ChatMessageRepo::find_between(
                pool,
                user_a,
                user_b,
                page_size,
                page_offset(page, page_size),
            )
            .await?;
            Ok((total, rows))
        })
        .await?;

        let messages = rows
            .into_iter()
            .map(|row| ChatMessage::try_from(row).map_err(StoreError::Backend))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HistoryPage {
            messages,
            total,
            page,
            page_size,
        })
    }
}
