//! Relation row model.

use polychat_core::relation::{Relation, RelationType};
use polychat_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `relations` table.
#[derive(Debug, Clone, FromRow)]
pub struct RelationRow {
    pub owner_id: DbId,
    pub target_id: DbId,
    /// `0` = pending, `1` = accepted (enforced by `ck_relations_type`).
    pub relation_type: i16,
    pub note: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<RelationRow> for Relation {
    type Error = String;

    fn try_from(row: RelationRow) -> Result<Self, Self::Error> {
        let relation_type = RelationType::from_code(row.relation_type).ok_or_else(|| {
            format!(
                "relation ({}, {}) has unknown relation_type {}",
                row.owner_id, row.target_id, row.relation_type
            )
        })?;
        Ok(Relation {
            owner_id: row.owner_id,
            target_id: row.target_id,
            relation_type,
            note: row.note,
        })
    }
}
