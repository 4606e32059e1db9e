//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod chat_message_repo;
pub mod relation_repo;
pub mod user_repo;

pub use chat_message_repo::ChatMessageRepo;
pub use relation_repo::RelationRepo;
pub use user_repo::UserRepo;
