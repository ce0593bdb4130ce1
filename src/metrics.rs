//! Metrics collection
//!
//! Counters and histograms go through the `metrics` facade. Nothing here
//! installs a recorder, so the calls are no-ops unless an embedding
//! application sets one up.

use std::time::Duration;

use ::metrics::{counter, histogram};

use crate::models::ImportSummary;

/// Records read from export documents
pub const RECORDS_READ_TOTAL: &str = "chat_history_records_read_total";
/// Messages written to a store
pub const MESSAGES_IMPORTED_TOTAL: &str = "chat_history_messages_imported_total";
/// Records dropped during import, labelled by reason
pub const RECORDS_SKIPPED_TOTAL: &str = "chat_history_records_skipped_total";
/// Messages included in rendered reports
pub const MESSAGES_REPORTED_TOTAL: &str = "chat_history_messages_reported_total";
/// Wall time of import and report operations
pub const OPERATION_DURATION: &str = "chat_history_operation_duration_seconds";

/// Record the outcome of an import
pub fn record_import(summary: &ImportSummary, format: &'static str, duration: Duration) {
    counter!(RECORDS_READ_TOTAL, "format" => format).increment(summary.total_records as u64);
    counter!(MESSAGES_IMPORTED_TOTAL, "format" => format).increment(summary.imported as u64);
    counter!(RECORDS_SKIPPED_TOTAL, "reason" => "missing_field").increment(summary.skipped_missing as u64);
    counter!(RECORDS_SKIPPED_TOTAL, "reason" => "unsupported").increment(summary.skipped_unsupported as u64);
    counter!(RECORDS_SKIPPED_TOTAL, "reason" => "duplicate").increment(summary.skipped_duplicate as u64);
    histogram!(OPERATION_DURATION, "operation" => "import").record(duration.as_secs_f64());
}

/// Record a rendered report
pub fn record_report(message_count: usize, duration: Duration) {
    counter!(MESSAGES_REPORTED_TOTAL).increment(message_count as u64);
    histogram!(OPERATION_DURATION, "operation" => "report").record(duration.as_secs_f64());
}
