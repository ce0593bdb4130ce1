use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use ::config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::{ChatHistoryError, Result};
use crate::models::DayZone;

/// Environment variable that overrides the store path
pub const STORE_ENV_VAR: &str = "CHAT_HISTORY_STORE";

/// Application configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Store location settings
    pub store: StoreConfig,
    /// Import behavior
    pub import: ImportConfig,
    /// Report rendering and output
    pub report: ReportConfig,
    /// Logging setup
    pub logging: LoggingConfig,
}

/// Store location settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Explicit store path; empty derives it from the input file
    pub path: String,
    /// Extension used when deriving a store path
    pub extension: String,
}

/// Import behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Sender name used for the operator's own messages
    pub self_name: String,
    /// Sender name used when an export gives none
    pub unknown_sender: String,
}

/// Report rendering and output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_directory: String,
    pub open_in_viewer: bool,
    /// IANA zone for day boundaries; empty uses the system zone
    pub timezone: String,
    /// chrono format string for message times
    pub time_format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for rolling log files; empty logs to the console only
    pub file_path: String,
    pub format: String, // "json" or "text"
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            extension: "db".to_string(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            self_name: "Me".to_string(),
            unknown_sender: "Unknown Sender".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_directory: ".".to_string(),
            open_in_viewer: true,
            timezone: String::new(),
            time_format: "%-I:%M %p".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: String::new(),
            format: "text".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence, layering an
    /// explicit file over the default locations
    pub fn load_with(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default())?)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("chat-history").required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let app_config: Self = builder
            .set_override_option("store.path", std::env::var(STORE_ENV_VAR).ok())?
            .build()?
            .try_deserialize()?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.store.extension.trim().is_empty() {
            return Err(ChatHistoryError::InvalidConfig("store.extension must not be empty".to_string()));
        }

        if self.import.self_name.trim().is_empty() {
            return Err(ChatHistoryError::InvalidConfig("import.self_name must not be empty".to_string()));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ChatHistoryError::InvalidConfig(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ChatHistoryError::InvalidConfig(format!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format, valid_formats
            )));
        }

        if self.report.time_format.trim().is_empty()
            || StrftimeItems::new(&self.report.time_format).any(|item| matches!(item, Item::Error))
        {
            return Err(ChatHistoryError::InvalidConfig(format!(
                "Invalid report.time_format: '{}'",
                self.report.time_format
            )));
        }

        self.day_zone()?;

        Ok(())
    }

    /// Time zone used for day boundaries and displayed times
    pub fn day_zone(&self) -> Result<DayZone> {
        DayZone::from_name(&self.report.timezone)
    }

    /// Store path for an input or store file.
    ///
    /// Precedence: an explicit path, then `target` itself when it already
    /// carries a store extension, then the configured path, then
    /// `<stem>.<extension>` beside `target`.
    #[must_use]
    pub fn resolve_store_path(&self, target: &Path, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }

        if self.is_store_file(target) {
            return target.to_path_buf();
        }

        if !self.store.path.is_empty() {
            return PathBuf::from(&self.store.path);
        }

        target.with_extension(&self.store.extension)
    }

    fn is_store_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.store.extension) || ext.eq_ignore_ascii_case("sqlite"))
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Log file directory, if file logging is enabled
    #[must_use]
    pub fn log_file_path(&self) -> Option<&Path> {
        (!self.logging.file_path.is_empty()).then(|| Path::new(&self.logging.file_path))
    }
}
