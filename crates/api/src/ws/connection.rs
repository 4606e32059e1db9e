use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::stream::SplitSink;
use futures::SinkExt;
use polychat_core::message::Message;
use polychat_core::types::DbId;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::presence::{ConnectionError, ConnectionHandle};

/// [`ConnectionHandle`] backed by the write half of an upgraded socket.
///
/// Writes go straight to the sink under an async mutex, bounded by
/// `write_timeout`. `close()` cancels a token that the connection's read
/// loop selects on.
pub struct WsConnection {
    user_id: DbId,
    sink: Mutex<SplitSink<WebSocket, WsMessage>>,
    cancel: CancellationToken,
    write_timeout: Duration,
}

impl WsConnection {
    pub fn new(
        user_id: DbId,
        sink: SplitSink<WebSocket, WsMessage>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            user_id,
            sink: Mutex::new(sink),
            cancel: CancellationToken::new(),
            write_timeout,
        }
    }

    /// Token cancelled by [`ConnectionHandle::close`].
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Send a Close frame and shut the sink. Errors are ignored: the peer
    /// may already be gone.
    pub async fn finish(&self) {
        let result = tokio::time::timeout(self.write_timeout, async {
            let mut sink = self.sink.lock().await;
            let _ = sink.send(WsMessage::Close(None)).await;
            let _ = sink.close().await;
        })
        .await;
        if result.is_err() {
            tracing::debug!(user_id = self.user_id, "Timed out sending Close frame");
        }
    }

    async fn write(&self, frame: WsMessage) -> Result<(), ConnectionError> {
        if self.cancel.is_cancelled() {
            return Err(ConnectionError::Closed);
        }

        let write = async { self.sink.lock().await.send(frame).await };
        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ConnectionError::Transport(e.to_string())),
            Err(_) => Err(ConnectionError::Timeout(self.write_timeout.as_secs())),
        }
    }
}

#[async_trait]
impl ConnectionHandle for WsConnection {
    async fn send(&self, message: &Message) -> Result<(), ConnectionError> {
        let json = serde_json::to_string(message)?;
        self.write(WsMessage::Text(json.into())).await
    }

    async fn ping(&self) -> Result<(), ConnectionError> {
        self.write(WsMessage::Ping(Bytes::new())).await
    }

    fn close(&self) {
        self.cancel.cancel();
    }
}
