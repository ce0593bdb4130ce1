use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, Row};
use tracing::debug;

use crate::error::{ChatHistoryError, Result};
use crate::models::{DayRange, Message, NewMessage};
use crate::schema::{messages, SCHEMA_VERSION};

/// Result of a bulk insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Rows written
    pub inserted: usize,
    /// Rows ignored because an identical message was already stored
    pub duplicates: usize,
}

/// SQLite-backed message store
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Create a store at `path`, or open it if the file already exists
    pub fn create(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::run_migrations(&conn)?;
        debug!("Opened store at {}", path.display());

        Ok(Self { conn, path: path.to_path_buf() })
    }

    /// Open an existing store read-only.
    ///
    /// The file is never migrated; one without a `messages` table is rejected
    /// with [`ChatHistoryError::InvalidStore`].
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ChatHistoryError::StoreNotFound(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
        let has_messages = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                [messages::TABLE],
                |row| row.get::<_, bool>(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::NotADatabase => {
                    ChatHistoryError::InvalidStore(path.to_path_buf())
                },
                other => other.into(),
            })?;
        if !has_messages {
            return Err(ChatHistoryError::InvalidStore(path.to_path_buf()));
        }

        Ok(Self { conn, path: path.to_path_buf() })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA encoding = 'UTF-8';")?;
        conn.execute_batch(include_str!("../migrations/2024-02-01-000000_create_messages/up.sql"))?;

        let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(())
    }

    /// Location of the store file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert messages in a single transaction.
    ///
    /// A message identical to a stored one (same chat, sender, timestamp and
    /// body) is ignored and counted as a duplicate.
    pub fn insert_messages(&mut self, new_messages: &[NewMessage]) -> Result<InsertOutcome> {
        let tx = self.conn.transaction()?;
        let imported_at = Utc::now();
        let mut outcome = InsertOutcome::default();

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO {} ({}, {}, {}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                messages::TABLE,
                messages::CHAT_NAME,
                messages::SENDER,
                messages::FROM_ME,
                messages::TIMESTAMP_MS,
                messages::BODY,
                messages::MEDIA_REFERENCE,
                messages::SOURCE_FILE,
                messages::IMPORTED_AT
            ))?;

            for message in new_messages {
                let changed = stmt.execute(params![
                    message.chat_name,
                    message.sender,
                    message.from_me,
                    message.timestamp.timestamp_millis(),
                    message.body,
                    message.media_reference,
                    message.source_file,
                    imported_at
                ])?;

                if changed == 0 {
                    outcome.duplicates += 1;
                } else {
                    outcome.inserted += 1;
                }
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    /// Messages sent within the range, ordered by conversation then time
    pub fn messages_between(&self, range: &DayRange) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {}, {}, {}, {}, {}, {}, {} FROM {} WHERE {} >= ?1 AND {} < ?2 ORDER BY {}, {}, {}",
            messages::ID,
            messages::CHAT_NAME,
            messages::SENDER,
            messages::FROM_ME,
            messages::TIMESTAMP_MS,
            messages::BODY,
            messages::MEDIA_REFERENCE,
            messages::TABLE,
            messages::TIMESTAMP_MS,
            messages::TIMESTAMP_MS,
            messages::CHAT_NAME,
            messages::TIMESTAMP_MS,
            messages::ID
        ))?;

        let message_iter = stmt.query_map(
            params![range.start.timestamp_millis(), range.end.timestamp_millis()],
            Self::map_message,
        )?;

        let mut results = Vec::new();
        for message in message_iter {
            results.push(message?);
        }

        Ok(results)
    }

    /// Send times of every stored message, oldest first
    pub fn timestamps(&self) -> Result<Vec<DateTime<Utc>>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY {}",
            messages::TIMESTAMP_MS,
            messages::TABLE,
            messages::TIMESTAMP_MS
        ))?;

        let rows = stmt.query_map([], |row| {
            let millis: i64 = row.get(0)?;
            millis_to_datetime(0, millis)
        })?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Number of stored messages
    pub fn message_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", messages::TABLE), [], |row| row.get(0))?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Close the underlying connection, surfacing any error
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }

    /// Map a database row to a Message
    fn map_message(row: &Row) -> rusqlite::Result<Message> {
        let millis: i64 = row.get(4)?;

        Ok(Message {
            id: row.get(0)?,
            chat_name: row.get(1)?,
            sender: row.get(2)?,
            from_me: row.get(3)?,
            timestamp: millis_to_datetime(4, millis)?,
            body: row.get(5)?,
            media_reference: row.get(6)?,
        })
    }
}

fn millis_to_datetime(column: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(rusqlite::Error::IntegralValueOutOfRange(column, millis))
}
