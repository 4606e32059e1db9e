//! Failure type shared by every store trait in this crate.
//!
//! Store implementations (Postgres in `polychat-db`, in-memory in
//! [`crate::memory`]) translate their backend errors into [`StoreError`] so
//! the relation engine and the message router never see driver types.

/// Infrastructure failure reported by a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (duplicate key, duplicate username).
    #[error("Duplicate record: {0}")]
    Conflict(String),

    /// The store call exceeded its internal deadline.
    #[error("Store operation timed out: {0}")]
    Timeout(&'static str),

    /// Any other backend failure (connection refused, bad SQL, ...).
    #[error("Store backend error: {0}")]
    Backend(String),
}
