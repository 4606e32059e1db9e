//! User accounts as seen by the core: identity resolution for the relation
//! engine and credential lookup for login.

use async_trait::async_trait;

use crate::store::StoreError;
use crate::types::DbId;

/// Maximum username length (matches the `users.username` column).
pub const MAX_USERNAME_LEN: usize = 20;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A stored user account.
///
/// Contains the password hash -- never serialize this to API responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: DbId,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

/// Insert DTO for a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
}

/// Validate a username for registration.
pub fn validate_username(username: &str) -> Result<(), String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err("Username must not be empty".into());
    }
    if trimmed != username {
        return Err("Username must not start or end with whitespace".into());
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!(
            "Username must be at most {MAX_USERNAME_LEN} characters"
        ));
    }
    Ok(())
}

/// User account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account. A taken username yields [`StoreError::Conflict`].
    async fn create(&self, user: NewUser) -> Result<UserAccount, StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<UserAccount>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Cheap reachability probe used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
