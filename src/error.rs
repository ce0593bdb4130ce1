//! Error types for the chat-history-search library.
//!
//! This module provides custom error types using `thiserror` so that the
//! importer and reporter can tell operator mistakes (bad date, missing store)
//! apart from environment failures (I/O, SQLite).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building or querying a chat history store.
#[derive(Error, Debug)]
pub enum ChatHistoryError {
    /// The export document could not be parsed or has an unknown structure
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A record lacks a required field; the record is skipped
    #[error("Record {index} is missing required field '{field}'")]
    MissingField {
        /// Position of the record in the export document
        index: usize,
        /// Name of the missing or unparseable field
        field: &'static str,
    },

    /// A record is a system entry rather than a message; the record is skipped
    #[error("Record {index} has unsupported type '{kind}'")]
    UnsupportedRecord {
        /// Position of the record in the export document
        index: usize,
        /// Entry type as given by the export
        kind: String,
    },

    /// Store creation was requested over an existing file
    #[error("Store already exists: {} (use --force to overwrite or --append to add to it)", .0.display())]
    StoreConflict(PathBuf),

    /// Query date is not a valid YYYY-MM-DD calendar date
    #[error("Invalid date '{0}': expected a calendar date in YYYY-MM-DD format")]
    InvalidDate(String),

    /// Query against a store that was never built
    #[error("Store not found: {} (run build-index first)", .0.display())]
    StoreNotFound(PathBuf),

    /// The file exists but is not a chat history store
    #[error("Not a chat history store: {}", .0.display())]
    InvalidStore(PathBuf),

    /// The report was written but no viewer could be launched
    #[error("Could not open report in a viewer: {0}")]
    ViewerLaunch(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for Result with `ChatHistoryError`
pub type Result<T> = std::result::Result<T, ChatHistoryError>;

impl From<::config::ConfigError> for ChatHistoryError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

impl From<tempfile::PersistError> for ChatHistoryError {
    fn from(err: tempfile::PersistError) -> Self {
        Self::Io(err.error)
    }
}
