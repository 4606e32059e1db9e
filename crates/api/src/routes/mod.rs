pub mod auth;
pub mod health;
pub mod message;
pub mod relation;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                 WebSocket (token in header or ?token=)
///
/// /auth/register                      create account (public)
/// /auth/login                         issue access token (public)
///
/// /messages/history                   conversation page with ?target_id=
///
/// /relations/requests                 send friend request (POST)
/// /relations/requests/pending         inbound pending requests
/// /relations/requests/accept          accept (POST)
/// /relations/requests/reject          reject (POST)
/// /relations/friends                  friend list with presence
/// /relations/friends/delete           delete friend (POST)
/// /relations/friends/note             update note (PUT)
/// /relations/reconcile                repair one-sided relations (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/auth", auth::router())
        .nest("/messages", message::router())
        .nest("/relations", relation::router())
}
