//! Route definitions for the `/relations` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::relation;
use crate::state::AppState;

/// Routes mounted at `/relations`. All require authentication.
///
/// ```text
/// POST /requests          -> send_request
/// GET  /requests/pending  -> list_pending
/// POST /requests/accept   -> accept_request
/// POST /requests/reject   -> reject_request
/// GET  /friends           -> list_friends
/// POST /friends/delete    -> delete_friend
/// PUT  /friends/note      -> update_note
/// POST /reconcile         -> reconcile
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests", post(relation::send_request))
        .route("/requests/pending", get(relation::list_pending))
        .route("/requests/accept", post(relation::accept_request))
        .route("/requests/reject", post(relation::reject_request))
        .route("/friends", get(relation::list_friends))
        .route("/friends/delete", post(relation::delete_friend))
        .route("/friends/note", put(relation::update_note))
        .route("/reconcile", post(relation::reconcile))
}
