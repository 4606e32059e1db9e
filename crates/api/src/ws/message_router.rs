//! Per-connection read loop.
//!
//! ```text
//! Connecting ──register──▶ Registered ──▶ ReadingLoop ──▶ Closed
//! ```
//!
//! The loop decodes each text frame, stamps it with the connection's user
//! id and the server time, persists chat messages in a detached task, and
//! delivers through the [`PresenceRegistry`]. Whatever ends the loop, the
//! cleanup step runs exactly once.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message as WsMessage;
use futures::{Stream, StreamExt};
use polychat_core::history::{HistoryStore, NewChatMessage};
use polychat_core::message::{decode_inbound, Message};
use polychat_core::types::{unix_now, DbId};
use tokio_util::sync::CancellationToken;

use crate::presence::{ConnectionHandle, PresenceRegistry};

/// Transport-neutral view of an inbound WebSocket frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary,
    Ping,
    Pong,
    Close,
}

impl From<WsMessage> for Frame {
    fn from(msg: WsMessage) -> Self {
        match msg {
            WsMessage::Text(text) => Frame::Text(text.as_str().to_owned()),
            WsMessage::Binary(_) => Frame::Binary,
            WsMessage::Ping(_) => Frame::Ping,
            WsMessage::Pong(_) => Frame::Pong,
            WsMessage::Close(_) => Frame::Close,
        }
    }
}

/// Why a read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer sent a Close frame.
    ClientClosed,
    /// The frame stream ended without a Close frame.
    StreamEnded,
    /// Reading the next frame failed.
    TransportError,
    /// A text frame could not be decoded into a message.
    MalformedFrame,
    /// A binary frame arrived; the protocol is text-only.
    UnsupportedFrame,
    /// The handle was closed, by replacement, eviction, or shutdown.
    Closed,
}

/// Routes messages read from one connection to their receivers.
#[derive(Clone)]
pub struct MessageRouter {
    presence: Arc<PresenceRegistry>,
    history: Arc<dyn HistoryStore>,
}

impl MessageRouter {
    pub fn new(presence: Arc<PresenceRegistry>, history: Arc<dyn HistoryStore>) -> Self {
        Self { presence, history }
    }

    /// Persist (chat only, detached) and deliver one stamped message.
    ///
    /// Returns once delivery has been attempted; persistence may still be
    /// in flight.
    pub async fn route(&self, message: Message) {
        if let Some(record) = NewChatMessage::from_message(&message) {
            let history = Arc::clone(&self.history);
            tokio::spawn(async move {
                let (sender_id, receiver_id) = (record.sender_id, record.receiver_id);
                match history.save(record).await {
                    Ok(saved) => {
                        tracing::debug!(id = saved.id, sender_id, receiver_id, "Chat message saved")
                    }
                    Err(e) => {
                        tracing::error!(sender_id, receiver_id, error = %e, "Failed to save chat message")
                    }
                }
            });
        }

        self.presence.deliver(&message).await;
    }

    /// Run the read loop for `user_id` until the connection ends.
    ///
    /// `handle` must already be registered for `user_id`, and `cancel` must
    /// be the token its `close()` cancels. On exit the handle is removed
    /// from the registry unless it has been replaced.
    pub async fn run<S, E>(
        &self,
        user_id: DbId,
        handle: Arc<dyn ConnectionHandle>,
        cancel: CancellationToken,
        mut frames: S,
    ) -> SessionEnd
    where
        S: Stream<Item = Result<Frame, E>> + Unpin,
        E: Display,
    {
        let end = loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => break SessionEnd::Closed,
                next = frames.next() => next,
            };

            let frame = match next {
                None => break SessionEnd::StreamEnded,
                Some(Err(e)) => {
                    tracing::debug!(user_id, error = %e, "WebSocket receive error");
                    break SessionEnd::TransportError;
                }
                Some(Ok(frame)) => frame,
            };

            let text = match frame {
                Frame::Text(text) => text,
                Frame::Ping | Frame::Pong => continue,
                Frame::Close => break SessionEnd::ClientClosed,
                Frame::Binary => {
                    tracing::warn!(user_id, "Binary frame received, closing connection");
                    break SessionEnd::UnsupportedFrame;
                }
            };

            match decode_inbound(&text, user_id, unix_now()) {
                Ok(message) => self.route(message).await,
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Malformed frame, closing connection");
                    break SessionEnd::MalformedFrame;
                }
            }
        };

        self.presence.unregister_connection(user_id, &handle).await;
        tracing::debug!(user_id, reason = ?end, "Read loop finished");
        end
    }
}
