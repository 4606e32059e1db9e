use std::sync::Arc;

use polychat_core::history::HistoryStore;
use polychat_core::relation::{RelationEngine, RelationStore};
use polychat_core::user::UserStore;

use crate::config::ServerConfig;
use crate::presence::PresenceRegistry;
use crate::ws::MessageRouter;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Online users and their live connections.
    pub presence: Arc<PresenceRegistry>,
    /// Read-loop routing shared by every WebSocket connection.
    pub messages: MessageRouter,
    /// Friend-request state machine.
    pub relations: Arc<RelationEngine>,
    pub history: Arc<dyn HistoryStore>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    /// Wire the registry, router, and relation engine over the given stores.
    pub fn new(
        config: ServerConfig,
        users: Arc<dyn UserStore>,
        relations: Arc<dyn RelationStore>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let messages = MessageRouter::new(Arc::clone(&presence), Arc::clone(&history));
        let relations = Arc::new(RelationEngine::new(relations, Arc::clone(&users)));

        Self {
            config: Arc::new(config),
            presence,
            messages,
            relations,
            history,
            users,
        }
    }
}
