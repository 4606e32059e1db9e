use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::StreamExt;
use polychat_core::types::DbId;

use crate::middleware::auth::AuthUser;
use crate::presence::ConnectionHandle;
use crate::state::AppState;
use crate::ws::connection::WsConnection;
use crate::ws::message_router::Frame;

/// GET /api/v1/ws
///
/// Authenticates before upgrading: a missing or invalid token is rejected
/// with 401 and no socket is opened.
pub async fn ws_handler(
    user: AuthUser,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, user.user_id, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// 1. Registers the connection, replacing any older one for the user.
/// 2. Runs the message router loop on the current task.
/// 3. Sends a Close frame once the loop has cleaned up.
async fn handle_socket(socket: WebSocket, user_id: DbId, state: AppState) {
    let (sink, stream) = socket.split();
    let connection = Arc::new(WsConnection::new(
        user_id,
        sink,
        Duration::from_secs(state.config.ws_write_timeout_secs),
    ));
    let cancel = connection.cancellation();
    let handle: Arc<dyn ConnectionHandle> = connection.clone();

    state.presence.register(user_id, Arc::clone(&handle)).await;
    tracing::info!(user_id, "WebSocket connected");

    let frames = stream.map(|result| result.map(Frame::from));
    let end = state.messages.run(user_id, handle, cancel, frames).await;

    connection.finish().await;
    tracing::info!(user_id, reason = ?end, "WebSocket disconnected");
}
