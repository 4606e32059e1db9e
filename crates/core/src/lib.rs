//! Polychat domain crate.
//!
//! Holds everything that does not touch a socket or a database driver: the
//! wire protocol, relation and history types, the store contracts, the
//! relation engine, and in-memory store implementations.

pub mod error;
pub mod history;
pub mod memory;
pub mod message;
pub mod relation;
pub mod store;
pub mod types;
pub mod user;
