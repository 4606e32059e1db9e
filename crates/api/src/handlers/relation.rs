//! Handlers for the `/relations` resource.
//!
//! Thin wrappers over [`RelationEngine`](polychat_core::relation::RelationEngine):
//! they validate input, call the engine, and hand any notification the
//! transition produces to the presence registry.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use polychat_core::error::CoreError;
use polychat_core::relation::{validate_note, ReconcileReport, Relation};
use polychat_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::notifications::notify;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /relations/requests`.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub target_id: DbId,
    #[serde(default)]
    pub note: String,
}

/// Request body for accept and reject.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub requester_id: DbId,
}

/// Request body for `POST /relations/friends/delete`.
#[derive(Debug, Deserialize)]
pub struct DeleteFriendRequest {
    pub target_id: DbId,
}

/// Request body for `PUT /relations/friends/note`.
#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub target_id: DbId,
    #[serde(default)]
    pub note: String,
}

/// An inbound pending request with the requester's name.
#[derive(Debug, Serialize)]
pub struct PendingRequest {
    pub requester_id: DbId,
    pub requester_name: String,
    pub note: String,
}

/// One entry of the caller's friend list.
#[derive(Debug, Serialize)]
pub struct FriendInfo {
    pub friend_id: DbId,
    pub username: String,
    pub note: String,
    pub is_online: bool,
}

fn check_note(note: &str) -> AppResult<()> {
    validate_note(note).map_err(|e| AppError::Core(CoreError::Validation(e)))
}

/// Username for `user_id`, or an empty string if the account is gone.
async fn username_of(state: &AppState, user_id: DbId) -> AppResult<String> {
    Ok(state
        .users
        .find_by_id(user_id)
        .await?
        .map(|u| u.username)
        .unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// POST /api/v1/relations/requests
pub async fn send_request(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SendRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Relation>>)> {
    check_note(&input.note)?;

    let created = state
        .relations
        .send_request(user.user_id, input.target_id, &input.note)
        .await?;
    notify(&state.presence, created.notification());

    let relation = Relation::pending(created.owner_id, created.target_id, created.note);
    Ok((StatusCode::CREATED, Json(DataResponse { data: relation })))
}

/// GET /api/v1/relations/requests/pending
pub async fn list_pending(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<PendingRequest>>>> {
    let pending = state.relations.list_pending(user.user_id).await?;

    let mut requests = Vec::with_capacity(pending.len());
    for relation in pending {
        requests.push(PendingRequest {
            requester_name: username_of(&state, relation.owner_id).await?,
            requester_id: relation.owner_id,
            note: relation.note,
        });
    }

    Ok(Json(DataResponse { data: requests }))
}

/// POST /api/v1/relations/requests/accept
pub async fn accept_request(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RespondRequest>,
) -> AppResult<Json<DataResponse<Relation>>> {
    let accepted = state
        .relations
        .accept(user.user_id, input.requester_id)
        .await?;
    notify(&state.presence, accepted.notification());

    Ok(Json(DataResponse {
        data: Relation::accepted(accepted.accepter_id, accepted.requester_id),
    }))
}

/// POST /api/v1/relations/requests/reject
pub async fn reject_request(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RespondRequest>,
) -> AppResult<StatusCode> {
    state
        .relations
        .reject(user.user_id, input.requester_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Friends
// ---------------------------------------------------------------------------

/// GET /api/v1/relations/friends
pub async fn list_friends(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<FriendInfo>>>> {
    let friends = state.relations.list_friends(user.user_id).await?;

    let mut result = Vec::with_capacity(friends.len());
    for relation in friends {
        result.push(FriendInfo {
            friend_id: relation.target_id,
            username: username_of(&state, relation.target_id).await?,
            note: relation.note,
            is_online: state.presence.is_online(relation.target_id).await,
        });
    }

    Ok(Json(DataResponse { data: result }))
}

/// POST /api/v1/relations/friends/delete
pub async fn delete_friend(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<DeleteFriendRequest>,
) -> AppResult<StatusCode> {
    state.relations.delete(user.user_id, input.target_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/relations/friends/note
pub async fn update_note(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateNoteRequest>,
) -> AppResult<StatusCode> {
    check_note(&input.note)?;
    state
        .relations
        .update_note(user.user_id, input.target_id, &input.note)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/relations/reconcile
pub async fn reconcile(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ReconcileReport>>> {
    let report = state.relations.reconcile(user.user_id).await?;
    Ok(Json(DataResponse { data: report }))
}
