//! Chat History Search - Day Reports from Chat Exports
//!
//! A Rust library for indexing exported chat histories into SQLite and
//! rendering everything said on a given day as a static HTML page.
//!
//! # Features
//!
//! - Import WhatsApp-style and generic JSON chat exports
//! - Atomic store builds with explicit overwrite/append modes
//! - Day queries evaluated in the local (or configured) time zone
//! - Self-contained HTML reports grouped by conversation

/// Configuration management
pub mod config;
/// Database operations
pub mod db;
/// Error types
pub mod error;
/// HTML report rendering
pub mod file_writer;
/// Building stores from export documents
pub mod importer;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Day report generation
pub mod reporter;
/// Database schema definitions
pub mod schema;
/// Export format adapters
pub mod source;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use config::AppConfig;
pub use db::Database;
pub use error::{ChatHistoryError, Result};
pub use importer::{build_index, ImportOptions};
pub use models::{DayReport, DayZone, ImportMode, ImportSummary, Message};
pub use reporter::{query_day, QueryOptions, ReportOutcome};
