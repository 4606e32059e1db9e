use async_trait::async_trait;
use polychat_core::message::Message;

/// Failure writing to a connection. Any of these makes the connection dead.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection is closed")]
    Closed,

    #[error("Write timed out after {0}s")]
    Timeout(u64),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// One user's live bidirectional channel, owned by the registry entry that
/// holds it. Identity is the `Arc` allocation, not any field.
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    /// Write one message to the peer.
    async fn send(&self, message: &Message) -> Result<(), ConnectionError>;

    /// Liveness probe written by the heartbeat task.
    async fn ping(&self) -> Result<(), ConnectionError> {
        Ok(())
    }

    /// Ask the connection to shut down. Must not block and must be safe to
    /// call more than once.
    fn close(&self);
}
