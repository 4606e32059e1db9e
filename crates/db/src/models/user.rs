//! User entity model.

use polychat_core::types::{DbId, Timestamp};
use polychat_core::user::UserAccount;
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<User> for UserAccount {
    fn from(row: User) -> Self {
        UserAccount {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            email: row.email,
            avatar: row.avatar,
        }
    }
}
