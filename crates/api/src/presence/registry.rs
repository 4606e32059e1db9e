//! The presence registry: at most one live connection per user.
//!
//! All state lives in a single `RwLock<HashMap>`. Lookups take the shared
//! lock; register/unregister/evict take the exclusive lock. Network writes
//! always happen after the lock is released, so a slow peer never blocks
//! other users.

use std::collections::HashMap;
use std::sync::Arc;

use polychat_core::message::Message;
use polychat_core::types::DbId;
use tokio::sync::RwLock;

use super::connection::ConnectionHandle;

type Handle = Arc<dyn ConnectionHandle>;

/// Compare handles by allocation, ignoring vtable pointers.
fn same_handle(a: &Handle, b: &Handle) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Maps each online user to the one connection currently serving them.
///
/// Designed to be wrapped in `Arc` and shared through `AppState`.
#[derive(Default)]
pub struct PresenceRegistry {
    connections: RwLock<HashMap<DbId, Handle>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handle` as the connection for `user_id`.
    ///
    /// An existing connection for the user is closed before the new one is
    /// installed, inside the same critical section, so readers see either
    /// the old handle or the new one and never a gap.
    pub async fn register(&self, user_id: DbId, handle: Handle) {
        let mut conns = self.connections.write().await;
        if let Some(previous) = conns.remove(&user_id) {
            previous.close();
            tracing::info!(user_id, "Replaced existing connection");
        }
        conns.insert(user_id, handle);
        tracing::info!(user_id, online = conns.len(), "User connected");
    }

    /// Remove and close the connection for `user_id`, if any. Idempotent.
    pub async fn unregister(&self, user_id: DbId) {
        let removed = self.connections.write().await.remove(&user_id);
        if let Some(handle) = removed {
            handle.close();
            tracing::info!(user_id, "User disconnected");
        }
    }

    /// Remove `user_id` only if its current connection is `handle`.
    ///
    /// Used by a connection's own cleanup and by eviction after a failed
    /// write: a handle that has already been replaced must not remove its
    /// successor. Returns whether an entry was removed.
    pub async fn unregister_connection(&self, user_id: DbId, handle: &Handle) -> bool {
        let mut conns = self.connections.write().await;
        match conns.get(&user_id) {
            Some(current) if same_handle(current, handle) => {
                conns.remove(&user_id);
                drop(conns);
                handle.close();
                tracing::info!(user_id, "User disconnected");
                true
            }
            // Already replaced; the replacement closed it.
            _ => false,
        }
    }

    pub async fn is_online(&self, user_id: DbId) -> bool {
        self.connections.read().await.contains_key(&user_id)
    }

    /// Write `message` to its receiver's connection.
    ///
    /// An offline receiver is not an error: the message is dropped. A failed
    /// write evicts the connection it was written to (and only that one).
    /// Never returns an error to the caller.
    pub async fn deliver(&self, message: &Message) {
        let receiver_id = message.receiver_id;
        let handle = self.connections.read().await.get(&receiver_id).cloned();

        let Some(handle) = handle else {
            tracing::debug!(
                receiver_id,
                sender_id = message.sender_id,
                kind = %message.kind,
                "Receiver offline, message dropped"
            );
            return;
        };

        if let Err(e) = handle.send(message).await {
            tracing::warn!(receiver_id, error = %e, "Delivery failed, evicting connection");
            self.unregister_connection(receiver_id, &handle).await;
        }
    }

    /// Return the current number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Ids of every online user, ascending.
    pub async fn online_users(&self) -> Vec<DbId> {
        let mut users: Vec<DbId> = self.connections.read().await.keys().copied().collect();
        users.sort_unstable();
        users
    }

    /// Ping every connection, evicting the ones whose ping fails.
    pub async fn ping_all(&self) {
        let snapshot: Vec<(DbId, Handle)> = self
            .connections
            .read()
            .await
            .iter()
            .map(|(id, h)| (*id, Arc::clone(h)))
            .collect();

        for (user_id, handle) in snapshot {
            if let Err(e) = handle.ping().await {
                tracing::warn!(user_id, error = %e, "Ping failed, evicting connection");
                self.unregister_connection(user_id, &handle).await;
            }
        }
    }

    /// Close every connection and clear the map.
    ///
    /// Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let drained: Vec<Handle> = {
            let mut conns = self.connections.write().await;
            conns.drain().map(|(_, h)| h).collect()
        };
        let count = drained.len();
        for handle in drained {
            handle.close();
        }
        tracing::info!(count, "Closed all connections");
    }
}
