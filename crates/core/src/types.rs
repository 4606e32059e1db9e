/// All database primary keys (users, chat messages) are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All row timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current server time as Unix seconds, the resolution used on the wire.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
