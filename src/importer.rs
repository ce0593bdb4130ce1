//! Building a store from a chat export document
//!
//! The whole document is read, parsed and normalized before the store is
//! touched. New stores are written to a temporary file next to the target and
//! renamed into place, so a failed import never leaves a half-built store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ImportConfig};
use crate::db::{Database, InsertOutcome};
use crate::error::{ChatHistoryError, Result};
use crate::logging::OperationTimer;
use crate::metrics;
use crate::models::{DayZone, ImportMode, ImportSummary, NewMessage, RawRecord};
use crate::source::{detect_format, parse_document};
use crate::validation::InputValidator;

/// Epoch values above this are taken as milliseconds
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// What to import and where
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Chat export document
    pub input: PathBuf,
    /// Store file to build
    pub store: PathBuf,
    /// Treatment of an existing store
    pub mode: ImportMode,
}

/// Import a chat export document into a store
pub fn build_index(config: &AppConfig, options: &ImportOptions) -> Result<ImportSummary> {
    let timer = OperationTimer::new("build_index");

    InputValidator::validate_input_file(&options.input)?;
    if same_file(&options.input, &options.store)? || (options.mode == ImportMode::Create && options.store.exists()) {
        return Err(ChatHistoryError::StoreConflict(options.store.clone()));
    }
    let zone = config.day_zone()?;

    info!("Loading export document: {}", options.input.display());
    let contents = fs::read(&options.input)?;
    let document = parse_document(&contents)?;
    let format = detect_format(&document, &config.import)?;
    let records = format.records(&document)?;
    info!(format = format.name(), records = records.len(), "Export document loaded");

    let source_file = options.input.file_name().map(|name| name.to_string_lossy().into_owned());
    let mut summary = ImportSummary {
        total_records: records.len(),
        ..ImportSummary::default()
    };

    let mut messages = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match normalize_record(index, record, zone, &config.import, source_file.as_deref()) {
            Ok(message) => messages.push(message),
            Err(e @ ChatHistoryError::MissingField { .. }) => {
                debug!("Skipping record: {}", e);
                summary.skipped_missing += 1;
            },
            Err(e @ ChatHistoryError::UnsupportedRecord { .. }) => {
                debug!("Skipping record: {}", e);
                summary.skipped_unsupported += 1;
            },
            Err(e) => return Err(e),
        }
    }

    if options.mode == ImportMode::Overwrite && options.store.exists() {
        info!("Overwriting existing store: {}", options.store.display());
    }
    let outcome = write_store(&options.store, options.mode, &messages)?;
    summary.imported = outcome.inserted;
    summary.skipped_duplicate = outcome.duplicates;

    info!(
        imported = summary.imported,
        skipped = summary.skipped(),
        duplicates = summary.skipped_duplicate,
        "Imported {} of {} records into {}",
        summary.imported,
        summary.total_records,
        options.store.display()
    );
    if summary.skipped_missing > 0 {
        warn!("Skipped {} records without a usable timestamp, chat name or content", summary.skipped_missing);
    }
    if summary.skipped_unsupported > 0 {
        info!("Skipped {} system entries (calls, deletions, notices)", summary.skipped_unsupported);
    }

    metrics::record_import(&summary, format.name(), timer.finish());
    Ok(summary)
}

/// Turn a raw record into an insertable message.
///
/// Fails with [`ChatHistoryError::UnsupportedRecord`] for system entries, and
/// with [`ChatHistoryError::MissingField`] when the record has no chat name,
/// no parseable timestamp, or neither text nor an attachment.
pub fn normalize_record(
    index: usize, record: RawRecord, zone: DayZone, config: &ImportConfig, source_file: Option<&str>,
) -> Result<NewMessage> {
    if let Some(kind) = record.unsupported_kind {
        return Err(ChatHistoryError::UnsupportedRecord { index, kind });
    }

    let chat_name = record
        .chat_name
        .ok_or(ChatHistoryError::MissingField { index, field: "chat_name" })?;

    let timestamp = record
        .timestamp
        .as_ref()
        .and_then(|value| parse_timestamp(value, zone))
        .ok_or(ChatHistoryError::MissingField { index, field: "timestamp" })?;

    let sender = record
        .sender
        .as_deref()
        .and_then(InputValidator::clean_name)
        .unwrap_or_else(|| config.unknown_sender.clone());

    let body = record.text.as_deref().map(InputValidator::sanitize_text).unwrap_or_default();
    if body.is_empty() && record.media.is_none() {
        return Err(ChatHistoryError::MissingField { index, field: "text" });
    }

    Ok(NewMessage {
        chat_name,
        sender,
        from_me: record.from_me,
        timestamp,
        body,
        media_reference: record.media,
        source_file: source_file.map(ToString::to_string),
    })
}

/// Interpret a timestamp value from an export document.
///
/// Accepts RFC 3339 strings, naive date-times and bare dates (read in
/// `zone`), and Unix epochs in seconds or milliseconds.
#[must_use]
pub fn parse_timestamp(value: &Value, zone: DayZone) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(number) => number.as_i64().map_or_else(
            || number.as_f64().and_then(from_epoch_float),
            from_epoch,
        ),
        Value::String(text) => parse_timestamp_str(text.trim(), zone),
        _ => None,
    }
}

fn parse_timestamp_str(text: &str, zone: DayZone) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return zone.resolve(naive);
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return zone.resolve(date.and_time(NaiveTime::MIN));
    }

    text.parse::<i64>().ok().and_then(from_epoch)
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() > MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn from_epoch_float(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }

    let millis = if value.abs() > MILLIS_THRESHOLD as f64 { value } else { value * 1000.0 };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

fn write_store(path: &Path, mode: ImportMode, messages: &[NewMessage]) -> Result<InsertOutcome> {
    if mode == ImportMode::Append {
        let mut db = Database::create(path)?;
        let outcome = db.insert_messages(messages)?;
        db.close()?;
        return Ok(outcome);
    }

    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut builder = tempfile::Builder::new();
    builder.prefix(".chat-history-").suffix(".db.tmp");
    #[cfg(unix)]
    builder.permissions(new_file_permissions());
    let staging = builder.tempfile_in(dir)?;
    // Replacing a store keeps its mode, as truncating it in place would
    let existing_permissions = fs::metadata(path).ok().map(|meta| meta.permissions());

    let mut db = Database::create(staging.path())?;
    let outcome = db.insert_messages(messages)?;
    db.close()?;

    if mode == ImportMode::Create {
        staging.persist_noclobber(path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                ChatHistoryError::StoreConflict(path.to_path_buf())
            } else {
                e.into()
            }
        })?;
    } else {
        staging.persist(path)?;
    }
    if let Some(permissions) = existing_permissions {
        fs::set_permissions(path, permissions)?;
    }

    debug!("Store written to {}", path.display());
    Ok(outcome)
}

/// Mode `File::create` would use; the process umask still applies
#[cfg(unix)]
fn new_file_permissions() -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    fs::Permissions::from_mode(0o666)
}

/// Whether `store` names the same file as `input`, which must exist
fn same_file(input: &Path, store: &Path) -> Result<bool> {
    let input = input.canonicalize()?;
    if let Ok(store) = store.canonicalize() {
        return Ok(store == input);
    }

    let parent = store
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(match (parent.canonicalize(), store.file_name()) {
        (Ok(parent), Some(name)) => parent.join(name) == input,
        _ => false,
    })
}
