//! Database schema definitions
//!
//! Constants for table and column names used with rusqlite. The DDL itself
//! lives in `migrations/`.

/// Schema version recorded in `PRAGMA user_version`
pub const SCHEMA_VERSION: i32 = 1;

/// Messages table schema
pub mod messages {
    /// Table name
    pub const TABLE: &str = "messages";
    /// Primary key column
    pub const ID: &str = "id";
    /// Conversation name column
    pub const CHAT_NAME: &str = "chat_name";
    /// Sender name column
    pub const SENDER: &str = "sender";
    /// Flag indicating if message is from current user
    pub const FROM_ME: &str = "from_me";
    /// Send time as Unix milliseconds (UTC)
    pub const TIMESTAMP_MS: &str = "timestamp_ms";
    /// Message text content column
    pub const BODY: &str = "body";
    /// Attachment kind column
    pub const MEDIA_REFERENCE: &str = "media_reference";
    /// Export file the row was imported from
    pub const SOURCE_FILE: &str = "source_file";
    /// Message import timestamp column
    pub const IMPORTED_AT: &str = "imported_at";
}
