//! Friend relationships.
//!
//! A relationship is stored as directed records keyed by the ordered pair
//! `(owner_id, target_id)`. An outstanding request is a single `Pending`
//! record from requester to target; an accepted friendship is two
//! independent `Accepted` records, one per direction.
//!
//! - [`engine`] -- the request lifecycle (send / accept / reject / delete).

pub mod engine;

use async_trait::async_trait;
use serde::Serialize;

use crate::store::StoreError;
use crate::types::DbId;

pub use engine::{ReconcileReport, RelationEngine, RequestAccepted, RequestCreated};

/// Maximum length of a relation note (matches the `relations.note` column).
pub const MAX_NOTE_LEN: usize = 20;

/// Validate a note supplied with a request or a note update.
pub fn validate_note(note: &str) -> Result<(), String> {
    if note.chars().count() > MAX_NOTE_LEN {
        return Err(format!("Note must be at most {MAX_NOTE_LEN} characters"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Relation types
// ---------------------------------------------------------------------------

/// State of a directed relation record. Stored as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Pending,
    Accepted,
}

impl RelationType {
    pub const PENDING_CODE: i16 = 0;
    pub const ACCEPTED_CODE: i16 = 1;

    pub fn code(self) -> i16 {
        match self {
            RelationType::Pending => Self::PENDING_CODE,
            RelationType::Accepted => Self::ACCEPTED_CODE,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            Self::PENDING_CODE => Some(RelationType::Pending),
            Self::ACCEPTED_CODE => Some(RelationType::Accepted),
            _ => None,
        }
    }
}

/// One user's directed view of a relationship with another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub owner_id: DbId,
    pub target_id: DbId,
    pub relation_type: RelationType,
    pub note: String,
}

impl Relation {
    /// An outstanding request from `owner_id` to `target_id`.
    pub fn pending(owner_id: DbId, target_id: DbId, note: impl Into<String>) -> Self {
        Self {
            owner_id,
            target_id,
            relation_type: RelationType::Pending,
            note: note.into(),
        }
    }

    /// An accepted edge with an empty note.
    pub fn accepted(owner_id: DbId, target_id: DbId) -> Self {
        Self {
            owner_id,
            target_id,
            relation_type: RelationType::Accepted,
            note: String::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.relation_type == RelationType::Pending
    }

    pub fn is_accepted(&self) -> bool {
        self.relation_type == RelationType::Accepted
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of relation-engine operations.
#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error("Cannot send a friend request to yourself")]
    InvalidTarget,

    #[error("User {0} does not exist")]
    TargetNotFound(DbId),

    #[error("You are already friends with this user")]
    AlreadyFriends,

    /// A pending request exists between the pair. `inbound` is `true` when
    /// the other user sent it, in which case the caller should accept or
    /// reject that request instead of sending a new one.
    #[error("{}", pending_message(*inbound))]
    RequestPending { inbound: bool },

    #[error("Friend request not found")]
    RequestNotFound,

    #[error("Friend request has already been handled")]
    RequestAlreadyHandled,

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn pending_message(inbound: bool) -> &'static str {
    if inbound {
        "This user has already sent you a friend request; accept or reject it instead"
    } else {
        "Friend request already sent; waiting for the other user to respond"
    }
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Durable table of directed relation records keyed by `(owner_id, target_id)`.
#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Insert a record. An existing record for the same ordered pair yields
    /// [`StoreError::Conflict`]; records are never silently overwritten.
    async fn create(&self, relation: &Relation) -> Result<(), StoreError>;

    /// Delete the record for the pair. Returns whether a row was removed.
    async fn delete_by_pair(&self, owner_id: DbId, target_id: DbId) -> Result<bool, StoreError>;

    /// Every record owned by `owner_id`, regardless of state.
    async fn find_by_owner(&self, owner_id: DbId) -> Result<Vec<Relation>, StoreError>;

    async fn find_by_pair(
        &self,
        owner_id: DbId,
        target_id: DbId,
    ) -> Result<Option<Relation>, StoreError>;

    /// Pending records addressed to `target_id` (inbound requests).
    async fn find_pending_by_target(&self, target_id: DbId) -> Result<Vec<Relation>, StoreError>;

    /// Returns whether a row was updated.
    async fn update_type(
        &self,
        owner_id: DbId,
        target_id: DbId,
        relation_type: RelationType,
    ) -> Result<bool, StoreError>;

    /// Returns whether a row was updated. A missing pair is not an error.
    async fn update_note(
        &self,
        owner_id: DbId,
        target_id: DbId,
        note: &str,
    ) -> Result<bool, StoreError>;

    /// Mark `(requester, accepter)` accepted and insert the reverse
    /// `(accepter, requester, accepted, "")` record.
    ///
    /// Only a record that is still pending is accepted. Returns `false`, with
    /// nothing written, when the request is gone or was already handled. A
    /// reverse record that already exists yields [`StoreError::Conflict`].
    ///
    /// The default performs independent calls: if the reverse insert fails
    /// after the update succeeded, a one-sided accepted edge remains (see
    /// [`RelationEngine::reconcile`]). Stores with transactions override this
    /// to apply both writes atomically.
    async fn accept_request(
        &self,
        requester_id: DbId,
        accepter_id: DbId,
    ) -> Result<bool, StoreError> {
        let pending = self
            .find_by_pair(requester_id, accepter_id)
            .await?
            .is_some_and(|r| r.is_pending());
        if !pending {
            return Ok(false);
        }
        if !self
            .update_type(requester_id, accepter_id, RelationType::Accepted)
            .await?
        {
            return Ok(false);
        }
        self.create(&Relation::accepted(accepter_id, requester_id))
            .await?;
        Ok(true)
    }
}
