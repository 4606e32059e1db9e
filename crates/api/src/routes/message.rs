//! Route definitions for the `/messages` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::message;
use crate::state::AppState;

/// Routes mounted at `/messages`.
///
/// ```text
/// GET /history -> history
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/history", get(message::history))
}
