use std::sync::Arc;
use std::time::Duration;

use crate::presence::PresenceRegistry;

/// Spawn a background task that pings every registered connection each
/// `interval`. Connections whose ping fails are evicted by the registry.
///
/// The task runs until aborted through the returned handle.
pub fn start_heartbeat(
    presence: Arc<PresenceRegistry>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let count = presence.connection_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            presence.ping_all().await;
        }
    })
}
