//! Repository for the `relations` table.
//!
//! Every query is keyed by the ordered pair `(owner_id, target_id)`.

use polychat_core::relation::RelationType;
use polychat_core::types::DbId;
use sqlx::PgPool;

use crate::models::relation::RelationRow;

/// Column list for `relations` queries.
const COLUMNS: &str = "owner_id, target_id, relation_type, note, created_at, updated_at";

/// Provides CRUD operations for directed relation records.
pub struct RelationRepo;

impl RelationRepo {
    /// Insert a relation. Fails with a primary-key violation if the ordered
    /// pair already exists; existing rows are never overwritten.
    pub async fn create(
        pool: &PgPool,
        owner_id: DbId,
        target_id: DbId,
        relation_type: RelationType,
        note: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO relations (owner_id, target_id, relation_type, note) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(owner_id)
        .bind(target_id)
        .bind(relation_type.code())
        .bind(note)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delete the row for the pair. Returns `true` if a row was removed.
    pub async fn delete_by_pair(
        pool: &PgPool,
        owner_id: DbId,
        target_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM relations WHERE owner_id = $1 AND target_id = $2")
            .bind(owner_id)
            .bind(target_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All rows owned by `owner_id`, oldest first.
    pub async fn find_by_owner(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Vec<RelationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM relations WHERE owner_id = $1 ORDER BY created_at, target_id"
        );
        sqlx::query_as::<_, RelationRow>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_pair(
        pool: &PgPool,
        owner_id: DbId,
        target_id: DbId,
    ) -> Result<Option<RelationRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM relations WHERE owner_id = $1 AND target_id = $2");
        sqlx::query_as::<_, RelationRow>(&query)
            .bind(owner_id)
            .bind(target_id)
            .fetch_optional(pool)
            .await
    }

    /// Pending rows addressed to `target_id`, oldest first.
    pub async fn find_pending_by_target(
        pool: &PgPool,
        target_id: DbId,
    ) -> Result<Vec<RelationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM relations \
             WHERE target_id = $1 AND relation_type = $2 \
             ORDER BY created_at, owner_id"
        );
        sqlx::query_as::<_, RelationRow>(&query)
            .bind(target_id)
            .bind(RelationType::Pending.code())
            .fetch_all(pool)
            .await
    }

    /// Returns `true` if a row was updated.
    pub async fn update_type(
        pool: &PgPool,
        owner_id: DbId,
        target_id: DbId,
        relation_type: RelationType,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE relations SET relation_type = $3, updated_at = NOW() \
             WHERE owner_id = $1 AND target_id = $2",
        )
        .bind(owner_id)
        .bind(target_id)
        .bind(relation_type.code())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns `true` if a row was updated.
    pub async fn update_note(
        pool: &PgPool,
        owner_id: DbId,
        target_id: DbId,
        note: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE relations SET note = $3, updated_at = NOW() \
             WHERE owner_id = $1 AND target_id = $2",
        )
        .bind(owner_id)
        .bind(target_id)
        .bind(note)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Accept a pending request in one transaction: mark
    /// `(requester_id, accepter_id)` accepted and insert the reverse
    /// accepted row with an empty note.
    ///
    /// Returns `false` and rolls back when the request is no longer pending.
    pub async fn accept(
        pool: &PgPool,
        requester_id: DbId,
        accepter_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE relations SET relation_type = $3, updated_at = NOW() \
             WHERE owner_id = $1 AND target_id = $2 AND relation_type = $4",
        )
        .bind(requester_id)
        .bind(accepter_id)
        .bind(RelationType::Accepted.code())
        .bind(RelationType::Pending.code())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO relations (owner_id, target_id, relation_type, note) \
             VALUES ($1, $2, $3, '')",
        )
        .bind(accepter_id)
        .bind(requester_id)
        .bind(RelationType::Accepted.code())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
