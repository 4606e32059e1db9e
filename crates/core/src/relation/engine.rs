//! Friend-request lifecycle over [`RelationStore`] records.
//!
//! ```text
//!   send_request(A, B)      accept(B, A)
//!   (none) ───────────▶ (A,B,pending) ───────────▶ (A,B,accepted) + (B,A,accepted)
//!                             │
//!                             └── reject(B, A) ──▶ (none)
//! ```
//!
//! Multi-record mutations are not atomic in general: `delete` removes the
//! caller's record and then best-effort removes the reverse one, and
//! `accept` is only atomic when the store overrides
//! [`RelationStore::accept_request`]. [`RelationEngine::reconcile`] repairs
//! the one-sided states those partial failures can leave behind.

use std::sync::Arc;

use serde::Serialize;

use crate::message::Message;
use crate::relation::{Relation, RelationError, RelationStore, RelationType};
use crate::store::StoreError;
use crate::types::DbId;
use crate::user::UserStore;

/// Outcome of a successful [`RelationEngine::send_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestCreated {
    pub owner_id: DbId,
    pub target_id: DbId,
    pub note: String,
}

impl RequestCreated {
    /// The `friend_request` notification for the target.
    pub fn notification(&self) -> Message {
        Message::friend_request(self.owner_id, self.target_id, &self.note)
    }
}

/// Outcome of a successful [`RelationEngine::accept`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAccepted {
    pub requester_id: DbId,
    pub accepter_id: DbId,
}

impl RequestAccepted {
    /// The `friend_accept` notification for the original requester.
    pub fn notification(&self) -> Message {
        Message::friend_accept(self.accepter_id, self.requester_id)
    }
}

/// What [`RelationEngine::reconcile`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Targets whose one-sided accepted edge was removed.
    pub removed: Vec<DbId>,
    /// Targets whose pending edge was promoted because the reverse edge was
    /// already accepted.
    pub promoted: Vec<DbId>,
}

/// Enforces the friend-request state machine.
pub struct RelationEngine {
    relations: Arc<dyn RelationStore>,
    users: Arc<dyn UserStore>,
}

impl RelationEngine {
    pub fn new(relations: Arc<dyn RelationStore>, users: Arc<dyn UserStore>) -> Self {
        Self { relations, users }
    }

    /// Send a friend request from `owner_id` to `target_id`.
    pub async fn send_request(
        &self,
        owner_id: DbId,
        target_id: DbId,
        note: &str,
    ) -> Result<RequestCreated, RelationError> {
        if owner_id == target_id {
            return Err(RelationError::InvalidTarget);
        }

        if self.users.find_by_id(target_id).await?.is_none() {
            return Err(RelationError::TargetNotFound(target_id));
        }

        let outbound = self.relations.find_by_pair(owner_id, target_id).await?;
        let inbound = self.relations.find_by_pair(target_id, owner_id).await?;

        if outbound.as_ref().is_some_and(Relation::is_accepted)
            || inbound.as_ref().is_some_and(Relation::is_accepted)
        {
            return Err(RelationError::AlreadyFriends);
        }
        if outbound.is_some() {
            return Err(RelationError::RequestPending { inbound: false });
        }
        if inbound.is_some() {
            return Err(RelationError::RequestPending { inbound: true });
        }

        let relation = Relation::pending(owner_id, target_id, note);
        match self.relations.create(&relation).await {
            Ok(()) => {}
            // Lost a race against an identical concurrent request.
            Err(StoreError::Conflict(_)) => {
                return Err(RelationError::RequestPending { inbound: false })
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(owner_id, target_id, "Friend request created");
        Ok(RequestCreated {
            owner_id,
            target_id,
            note: relation.note,
        })
    }

    /// Accept the pending request `requester_id` sent to `current_user_id`.
    pub async fn accept(
        &self,
        current_user_id: DbId,
        requester_id: DbId,
    ) -> Result<RequestAccepted, RelationError> {
        self.pending_request(requester_id, current_user_id).await?;

        match self
            .relations
            .accept_request(requester_id, current_user_id)
            .await
        {
            Ok(true) => {}
            // The request changed after the check above; report its
            // current state.
            Ok(false) => {
                self.pending_request(requester_id, current_user_id).await?;
                return Err(RelationError::RequestAlreadyHandled);
            }
            Err(StoreError::Conflict(_)) => return Err(RelationError::RequestAlreadyHandled),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            requester_id,
            accepter_id = current_user_id,
            "Friend request accepted"
        );
        Ok(RequestAccepted {
            requester_id,
            accepter_id: current_user_id,
        })
    }

    /// Reject the pending request `requester_id` sent to `current_user_id`.
    /// The request record is deleted; no trace is kept.
    pub async fn reject(
        &self,
        current_user_id: DbId,
        requester_id: DbId,
    ) -> Result<(), RelationError> {
        self.pending_request(requester_id, current_user_id).await?;

        self.relations
            .delete_by_pair(requester_id, current_user_id)
            .await?;

        tracing::info!(
            requester_id,
            rejecter_id = current_user_id,
            "Friend request rejected"
        );
        Ok(())
    }

    /// Remove `owner_id`'s relation to `target_id` and, best effort, the
    /// reverse relation.
    pub async fn delete(&self, owner_id: DbId, target_id: DbId) -> Result<(), RelationError> {
        self.relations.delete_by_pair(owner_id, target_id).await?;

        if let Err(e) = self.relations.delete_by_pair(target_id, owner_id).await {
            tracing::warn!(
                owner_id,
                target_id,
                error = %e,
                "Reverse relation delete failed, leaving a one-sided relation"
            );
        }

        tracing::info!(owner_id, target_id, "Relation deleted");
        Ok(())
    }

    /// Accepted relations owned by `owner_id`.
    pub async fn list_friends(&self, owner_id: DbId) -> Result<Vec<Relation>, RelationError> {
        let mut relations = self.relations.find_by_owner(owner_id).await?;
        relations.retain(Relation::is_accepted);
        Ok(relations)
    }

    /// Pending requests addressed to `target_id`.
    pub async fn list_pending(&self, target_id: DbId) -> Result<Vec<Relation>, RelationError> {
        Ok(self.relations.find_pending_by_target(target_id).await?)
    }

    /// Set `owner_id`'s note on its relation to `target_id`.
    ///
    /// No existence check: updating a missing pair is a no-op.
    pub async fn update_note(
        &self,
        owner_id: DbId,
        target_id: DbId,
        note: &str,
    ) -> Result<(), RelationError> {
        let updated = self
            .relations
            .update_note(owner_id, target_id, note)
            .await?;
        if !updated {
            tracing::debug!(owner_id, target_id, "Note update matched no relation");
        }
        Ok(())
    }

    /// Read-repair pass over the relations owned by `owner_id`.
    ///
    /// - An accepted edge whose reverse record is missing is removed. With a
    ///   transactional accept this state only arises from a delete whose
    ///   reverse half failed, so removing it completes that delete.
    /// - A pending edge whose reverse record is already accepted is promoted
    ///   to accepted.
    pub async fn reconcile(&self, owner_id: DbId) -> Result<ReconcileReport, RelationError> {
        let mut report = ReconcileReport::default();

        for relation in self.relations.find_by_owner(owner_id).await? {
            let target_id = relation.target_id;
            let reverse = self.relations.find_by_pair(target_id, owner_id).await?;

            match (relation.relation_type, reverse) {
                (RelationType::Accepted, None) => {
                    self.relations.delete_by_pair(owner_id, target_id).await?;
                    report.removed.push(target_id);
                }
                (RelationType::Pending, Some(reverse)) if reverse.is_accepted() => {
                    self.relations
                        .update_type(owner_id, target_id, RelationType::Accepted)
                        .await?;
                    report.promoted.push(target_id);
                }
                _ => {}
            }
        }

        if !report.removed.is_empty() || !report.promoted.is_empty() {
            tracing::warn!(
                owner_id,
                removed = ?report.removed,
                promoted = ?report.promoted,
                "Repaired asymmetric relations"
            );
        }
        Ok(report)
    }

    /// Load the `(requester_id, target_id)` record and require it pending.
    async fn pending_request(
        &self,
        requester_id: DbId,
        target_id: DbId,
    ) -> Result<Relation, RelationError> {
        let relation = self
            .relations
            .find_by_pair(requester_id, target_id)
            .await?
            .ok_or(RelationError::RequestNotFound)?;

        if !relation.is_pending() {
            return Err(RelationError::RequestAlreadyHandled);
        }
        Ok(relation)
    }
}
