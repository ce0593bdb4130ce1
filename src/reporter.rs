//! Day reports: select one calendar day's messages and render them to HTML

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::db::Database;
use crate::error::{ChatHistoryError, Result};
use crate::file_writer::write_report_file;
use crate::logging::OperationTimer;
use crate::metrics;
use crate::models::{Conversation, DayReport, DayZone, Message};
use crate::validation::InputValidator;

/// What to report on and where to write it
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Store to query
    pub store: PathBuf,
    /// Requested day as typed by the operator (`YYYY-MM-DD`)
    pub date: String,
    /// Directory the report file is written to
    pub output_dir: PathBuf,
    /// Launch the default viewer after writing
    pub open_viewer: bool,
}

/// Result of a report run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    /// Written report file
    pub path: PathBuf,
    /// Reported day
    pub date: NaiveDate,
    /// Messages in the report
    pub message_count: usize,
    /// Conversations in the report
    pub conversation_count: usize,
    /// Whether a viewer was launched successfully
    pub viewer_opened: bool,
}

/// Render the report for one day and write it to disk.
///
/// The date is validated before the store is opened, so an invalid date
/// never produces a file.
pub fn query_day(config: &AppConfig, options: &QueryOptions) -> Result<ReportOutcome> {
    let timer = OperationTimer::new("query_day");

    let date = InputValidator::validate_report_date(&options.date)?;
    let zone = config.day_zone()?;
    let db = Database::open(&options.store)?;

    let report = collect_day(&db, zone, date)?;
    let path = options.output_dir.join(report_file_name(&options.store, date));
    write_report_file(&report, zone, &config.report.time_format, &path)?;

    if report.is_empty() {
        info!("No messages found for {}", date);
    }
    info!(
        messages = report.message_count(),
        conversations = report.conversations.len(),
        "Wrote report to {}",
        path.display()
    );

    let viewer_opened = options.open_viewer
        && match open_in_viewer(&path) {
            Ok(()) => {
                info!("Opening report in the default viewer");
                true
            },
            Err(e) => {
                warn!("{}", e);
                false
            },
        };

    metrics::record_report(report.message_count(), timer.finish());

    Ok(ReportOutcome {
        path,
        date,
        message_count: report.message_count(),
        conversation_count: report.conversations.len(),
        viewer_opened,
    })
}

/// Collect the messages of one day, grouped by conversation.
///
/// Messages keep their chronological order inside a conversation;
/// conversations are ordered by their first message of the day.
pub fn collect_day(db: &Database, zone: DayZone, date: NaiveDate) -> Result<DayReport> {
    let range = zone.day_range(date)?;
    let messages = db.messages_between(&range)?;

    Ok(DayReport {
        date,
        conversations: group_by_chat(messages),
    })
}

/// Number of stored messages per calendar day in `zone`
pub fn day_counts(db: &Database, zone: DayZone) -> Result<BTreeMap<NaiveDate, usize>> {
    let mut counts = BTreeMap::new();
    for timestamp in db.timestamps()? {
        *counts.entry(zone.date_of(timestamp)).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Report file name: `<store stem>_<YYYY-MM-DD>.html`
#[must_use]
pub fn report_file_name(store: &Path, date: NaiveDate) -> String {
    let stem = store
        .file_stem()
        .map_or_else(|| "chat".to_string(), |stem| stem.to_string_lossy().into_owned());
    format!("{}_{}.html", stem, date.format("%Y-%m-%d"))
}

/// Hand a file to the operating system's default viewer
pub fn open_in_viewer(path: &Path) -> Result<()> {
    open::that(path).map_err(|e| ChatHistoryError::ViewerLaunch(format!("{}: {}", path.display(), e)))
}

/// Expects messages sorted by chat name, then time
fn group_by_chat(messages: Vec<Message>) -> Vec<Conversation> {
    let mut conversations: Vec<Conversation> = Vec::new();

    for message in messages {
        match conversations.last_mut() {
            Some(current) if current.chat_name == message.chat_name => current.messages.push(message),
            _ => conversations.push(Conversation {
                chat_name: message.chat_name.clone(),
                messages: vec![message],
            }),
        }
    }

    conversations.sort_by_key(Conversation::first_timestamp);
    conversations
}
