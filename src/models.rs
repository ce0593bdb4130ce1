//! Data models for message handling and storage
//!
//! This module contains the data structures shared by the importer, the store
//! and the reporter, plus the time-zone handling that decides which calendar
//! day a message belongs to.

use chrono::{DateTime, Days, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{ChatHistoryError, Result};

/// A stored message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-wide unique identifier
    pub id: i64,
    /// Conversation the message belongs to (group or contact name)
    pub chat_name: String,
    /// Display name of the author
    pub sender: String,
    /// True if the operator sent the message
    pub from_me: bool,
    /// Instant the message was sent
    pub timestamp: DateTime<Utc>,
    /// Text content, empty for media-only messages
    pub body: String,
    /// Kind of attachment carried by the message, if any
    pub media_reference: Option<String>,
}

impl Message {
    /// Whether the message carried an attachment
    #[must_use]
    pub const fn has_media(&self) -> bool {
        self.media_reference.is_some()
    }
}

/// A normalized message ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Conversation name
    pub chat_name: String,
    /// Author display name
    pub sender: String,
    /// True if the operator sent the message
    pub from_me: bool,
    /// Instant the message was sent
    pub timestamp: DateTime<Utc>,
    /// Text content
    pub body: String,
    /// Attachment kind
    pub media_reference: Option<String>,
    /// File name of the export the message came from
    pub source_file: Option<String>,
}

/// Raw field mapping produced by an export format adapter.
///
/// Nothing here is validated yet; the importer decides what is usable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// Conversation name, if the export provided one
    pub chat_name: Option<String>,
    /// Resolved sender name
    pub sender: Option<String>,
    /// True if the operator sent the message
    pub from_me: bool,
    /// Timestamp exactly as it appeared in the document
    pub timestamp: Option<serde_json::Value>,
    /// Text content
    pub text: Option<String>,
    /// Attachment kind
    pub media: Option<String>,
    /// Entry type the export marks as something other than a message
    /// (call logs, deletion notices); such records are never imported
    pub unsupported_kind: Option<String>,
}

/// How the importer treats an existing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Build a new store; fail if one already exists
    #[default]
    Create,
    /// Replace an existing store
    Overwrite,
    /// Add to an existing store, creating it if missing
    Append,
}

/// Counts reported at the end of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Records found in the export document
    pub total_records: usize,
    /// Messages written to the store
    pub imported: usize,
    /// Records dropped for a missing or unparseable field
    pub skipped_missing: usize,
    /// Records dropped because they are not chat messages
    pub skipped_unsupported: usize,
    /// Records dropped because the store already held them
    pub skipped_duplicate: usize,
}

impl ImportSummary {
    /// All records that did not become a message
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped_missing + self.skipped_unsupported + self.skipped_duplicate
    }
}

/// Half-open UTC interval covering one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    /// Start of the day (inclusive)
    pub start: DateTime<Utc>,
    /// Start of the next day (exclusive)
    pub end: DateTime<Utc>,
}

impl DayRange {
    /// Whether the instant falls within the day
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Time zone used to bucket messages into calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayZone {
    /// The operating system's local zone
    #[default]
    Local,
    /// A named IANA zone
    Named(Tz),
}

impl DayZone {
    /// Parse a zone name; an empty name selects the system local zone
    pub fn from_name(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(Self::Local);
        }
        name.parse::<Tz>()
            .map(Self::Named)
            .map_err(|e| ChatHistoryError::InvalidConfig(format!("Unknown time zone '{name}': {e}")))
    }

    /// UTC interval of the given calendar day in this zone
    pub fn day_range(self, date: NaiveDate) -> Result<DayRange> {
        let next = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ChatHistoryError::InvalidDate(date.to_string()))?;
        Ok(DayRange {
            start: self.start_of_day(date),
            end: self.start_of_day(next),
        })
    }

    /// Wall-clock time of an instant in this zone
    #[must_use]
    pub fn localize(self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Self::Local => instant.with_timezone(&Local).naive_local(),
            Self::Named(tz) => instant.with_timezone(&tz).naive_local(),
        }
    }

    /// Calendar day an instant belongs to in this zone
    #[must_use]
    pub fn date_of(self, instant: DateTime<Utc>) -> NaiveDate {
        self.localize(instant).date()
    }

    /// Resolve a wall-clock time in this zone to an instant
    #[must_use]
    pub fn resolve(self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::Local => resolve_in(&Local, naive),
            Self::Named(tz) => resolve_in(&tz, naive),
        }
    }

    fn start_of_day(self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        self.resolve(midnight)
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }
}

/// Earliest instant for a wall-clock time; times inside a DST gap move
/// forward to the first minute that exists.
fn resolve_in<Z: TimeZone>(zone: &Z, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
        LocalResult::None => (1..=180).find_map(|minutes| {
            zone.from_local_datetime(&(naive + Duration::minutes(minutes)))
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
        }),
    }
}

/// Messages of one conversation on the reported day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// Conversation name
    pub chat_name: String,
    /// Messages in chronological order
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Timestamp of the first message, used to order conversations
    #[must_use]
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.messages.first().map(|m| m.timestamp)
    }
}

/// Everything the reporter renders for one calendar day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    /// Reported calendar day
    pub date: NaiveDate,
    /// Conversations ordered by their first message of the day
    pub conversations: Vec<Conversation>,
}

impl DayReport {
    /// Total number of messages across all conversations
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.conversations.iter().map(|c| c.messages.len()).sum()
    }

    /// True when no message matched the day
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
