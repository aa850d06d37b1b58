//! Defaults and JSON configuration files.
//!
//! A config file holds any subset of the importer settings; absent keys keep their defaults and
//! command-line flags override whatever the file sets:
//!
//! ```json
//! {
//!   "database": "lab.db",
//!   "batch_size": 500,
//!   "sample_rows": 50,
//!   "pattern": "*.csv",
//!   "recursive": true,
//!   "log_file": "logs/import.log"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::IngestionResult;
use crate::ingestion::{ImportOptions, IngestionSeverity, LogSink};

/// Rows per insert group.
pub const DEFAULT_BATCH_SIZE: usize = 1000;
/// Data rows sampled for type inference.
pub const DEFAULT_SAMPLE_ROWS: usize = 100;
/// File-name pattern for directory imports.
pub const DEFAULT_PATTERN: &str = "*.csv";
/// Database file used by the command-line tool when none is given.
pub const DEFAULT_DATABASE: &str = "instrument_data.db";
/// Log file used by the command-line tool when none is given.
pub const DEFAULT_LOG_FILE: &str = "csv_import.log";

/// On-disk importer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    pub database: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub sample_rows: Option<usize>,
    pub pattern: Option<String>,
    pub recursive: Option<bool>,
    pub log_file: Option<PathBuf>,
    pub alert_at_or_above: Option<IngestionSeverity>,
}

impl ImportConfig {
    /// Load a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> IngestionResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Overlay the values this file sets onto `options`.
    ///
    /// `log_file` adds a [`LogSink::File`] unless one for the same path is already present.
    pub fn apply_to(&self, options: &mut ImportOptions) {
        if let Some(n) = self.batch_size {
            options.batch_size = n;
        }
        if let Some(n) = self.sample_rows {
            options.sample_rows = n;
        }
        if let Some(p) = &self.pattern {
            options.pattern = p.clone();
        }
        if let Some(r) = self.recursive {
            options.recursive = r;
        }
        if let Some(sev) = self.alert_at_or_above {
            options.alert_at_or_above = sev;
        }
        if let Some(path) = &self.log_file {
            let sink = LogSink::File(path.clone());
            if !options.log_sinks.contains(&sink) {
                options.log_sinks.push(sink);
            }
        }
    }
}
