//! Presence: which users are online and the one live connection each holds.
//!
//! - [`connection`] -- the [`ConnectionHandle`] trait the registry stores.
//! - [`registry`] -- the [`PresenceRegistry`] map and delivery path.

pub mod connection;
pub mod registry;

pub use connection::{ConnectionError, ConnectionHandle};
pub use registry::PresenceRegistry;
