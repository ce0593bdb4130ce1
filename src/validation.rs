use std::io;
use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{ChatHistoryError, Result};

#[allow(clippy::expect_used)]
fn date_shape() -> &'static Regex {
    static DATE_SHAPE: OnceLock<Regex> = OnceLock::new();
    DATE_SHAPE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"))
}

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Parse a report date, requiring the exact `YYYY-MM-DD` shape
    pub fn validate_report_date(date: &str) -> Result<NaiveDate> {
        let trimmed = date.trim();
        if !date_shape().is_match(trimmed) {
            return Err(ChatHistoryError::InvalidDate(date.to_string()));
        }

        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| ChatHistoryError::InvalidDate(date.to_string()))
    }

    /// Ensure the export document exists and is a regular file
    pub fn validate_input_file(path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(ChatHistoryError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "input file path cannot be empty",
            )));
        }

        if !path.is_file() {
            return Err(ChatHistoryError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("input file not found: {}", path.display()),
            )));
        }

        Ok(())
    }

    /// Normalize a chat or sender name; blank names become `None`
    #[must_use]
    pub fn clean_name(name: &str) -> Option<String> {
        let cleaned = Self::sanitize_text(name);
        (!cleaned.is_empty()).then_some(cleaned)
    }

    /// Sanitize text input: NFC-normalize and drop control characters other
    /// than newlines and tabs
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.nfc()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
