//! Row models for the `users`, `relations`, and `chat_messages` tables.

pub mod chat_message;
pub mod relation;
pub mod user;
