//! WebSocket transport for the chat protocol.
//!
//! Provides the upgrade handler, the socket-backed connection handle, the
//! per-connection message router loop, and the heartbeat task.

mod connection;
mod handler;
mod heartbeat;
pub mod message_router;

pub use connection::WsConnection;
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use message_router::{Frame, MessageRouter, SessionEnd};
