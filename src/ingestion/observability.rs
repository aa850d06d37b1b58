use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::IngestionError;
use crate::types::{FileOutcome, FileReport, RowError, TableDefinition};

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (a file could not be imported).
    Error,
    /// Critical error (missing inputs or other I/O failures).
    Critical,
}

impl IngestionSeverity {
    /// Classify a file-level failure.
    pub fn for_error(e: &IngestionError) -> Self {
        match e {
            IngestionError::Io(_) | IngestionError::NotFound { .. } | IngestionError::Walk(_) => {
                Self::Critical
            }
            IngestionError::Csv(err) if err.is_io_error() => Self::Critical,
            IngestionError::NotConnected => Self::Critical,
            IngestionError::Csv(_)
            | IngestionError::Store(_)
            | IngestionError::Pattern(_)
            | IngestionError::Config(_)
            | IngestionError::MissingHeader { .. }
            | IngestionError::InvalidOptions { .. } => Self::Error,
        }
    }
}

/// Context about a single file import.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// The input path.
    pub path: PathBuf,
    /// Target table, once it is known.
    pub table: Option<String>,
}

impl IngestionContext {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: None,
        }
    }
}

/// Observer interface for import progress and outcomes.
///
/// This is the importer's logger handle: every progress message, row warning and file failure
/// goes through it. Implementors can record metrics, write logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called before a file is opened.
    fn on_file_started(&self, _ctx: &IngestionContext) {}

    /// Called once the target table is known, with `created` set if this file created it.
    fn on_table_ready(&self, _ctx: &IngestionContext, _table: &TableDefinition, _created: bool) {}

    /// Called after each committed batch group.
    fn on_batch_committed(&self, _ctx: &IngestionContext, _rows: usize, _imported_so_far: usize) {}

    /// Called for every skipped row.
    fn on_row_skipped(&self, _ctx: &IngestionContext, _error: &RowError) {}

    /// Called when a directory import finds no file matching `pattern`.
    fn on_no_matching_files(&self, _ctx: &IngestionContext, _pattern: &str) {}

    /// Called when a file finishes, whatever its outcome.
    fn on_file_finished(&self, _ctx: &IngestionContext, _report: &FileReport) {}

    /// Called when a file fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when a file failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_file_started(&self, ctx: &IngestionContext) {
        for o in &self.observers {
            o.on_file_started(ctx);
        }
    }

    fn on_table_ready(&self, ctx: &IngestionContext, table: &TableDefinition, created: bool) {
        for o in &self.observers {
            o.on_table_ready(ctx, table, created);
        }
    }

    fn on_batch_committed(&self, ctx: &IngestionContext, rows: usize, imported_so_far: usize) {
        for o in &self.observers {
            o.on_batch_committed(ctx, rows, imported_so_far);
        }
    }

    fn on_row_skipped(&self, ctx: &IngestionContext, error: &RowError) {
        for o in &self.observers {
            o.on_row_skipped(ctx, error);
        }
    }

    fn on_no_matching_files(&self, ctx: &IngestionContext, pattern: &str) {
        for o in &self.observers {
            o.on_no_matching_files(ctx, pattern);
        }
    }

    fn on_file_finished(&self, ctx: &IngestionContext, report: &FileReport) {
        for o in &self.observers {
            o.on_file_finished(ctx, report);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits import events as `tracing` events (the console sink).
///
/// Progress is logged at `info`, skipped rows at `warn`, file failures at `error`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_file_started(&self, ctx: &IngestionContext) {
        info!(path = %ctx.path.display(), "starting import");
    }

    fn on_table_ready(&self, ctx: &IngestionContext, table: &TableDefinition, created: bool) {
        if created {
            info!(path = %ctx.path.display(), table = %table.name, columns = table.columns.len(), "table created");
        } else {
            info!(path = %ctx.path.display(), table = %table.name, "table exists; appending");
        }
    }

    fn on_batch_committed(&self, ctx: &IngestionContext, rows: usize, imported_so_far: usize) {
        info!(
            path = %ctx.path.display(),
            batch_rows = rows,
            imported = imported_so_far,
            "imported {imported_so_far} rows..."
        );
    }

    fn on_row_skipped(&self, ctx: &IngestionContext, error: &RowError) {
        warn!(path = %ctx.path.display(), row = ?error.row_number, reason = %error.reason, "row skipped");
    }

    fn on_no_matching_files(&self, ctx: &IngestionContext, pattern: &str) {
        warn!(dir = %ctx.path.display(), pattern, "no matching files found");
    }

    fn on_file_finished(&self, ctx: &IngestionContext, report: &FileReport) {
        match &report.outcome {
            FileOutcome::Imported => info!(
                path = %ctx.path.display(),
                table = ?report.table,
                total = report.total_rows_seen,
                imported = report.imported_rows,
                skipped = report.skipped_rows,
                "import complete"
            ),
            FileOutcome::Empty => warn!(path = %ctx.path.display(), "empty file; nothing to import"),
            FileOutcome::Failed { .. } => {}
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        error!(path = %ctx.path.display(), ?severity, err = %error, "import failed");
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        error!(path = %ctx.path.display(), ?severity, err = %error, "ALERT: import failed");
    }
}

/// Appends import events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, level: &str, message: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{} - {level} - {message}", timestamp());
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_file_started(&self, ctx: &IngestionContext) {
        self.append_line("INFO", &format!("Starting import from: {}", ctx.path.display()));
    }

    fn on_table_ready(&self, _ctx: &IngestionContext, table: &TableDefinition, created: bool) {
        let verb = if created { "created" } else { "verified" };
        self.append_line("INFO", &format!("Table '{}' {verb}", table.name));
    }

    fn on_batch_committed(&self, _ctx: &IngestionContext, _rows: usize, imported_so_far: usize) {
        self.append_line("INFO", &format!("Imported {imported_so_far} rows..."));
    }

    fn on_row_skipped(&self, _ctx: &IngestionContext, error: &RowError) {
        self.append_line("WARNING", &format!("Skipped {error}"));
    }

    fn on_no_matching_files(&self, ctx: &IngestionContext, pattern: &str) {
        self.append_line(
            "WARNING",
            &format!("No files matching '{pattern}' found in {}", ctx.path.display()),
        );
    }

    fn on_file_finished(&self, ctx: &IngestionContext, report: &FileReport) {
        match &report.outcome {
            FileOutcome::Imported => self.append_line(
                "INFO",
                &format!(
                    "Import complete - path: {}, Total: {}, Imported: {}, Skipped: {}",
                    ctx.path.display(),
                    report.total_rows_seen,
                    report.imported_rows,
                    report.skipped_rows
                ),
            ),
            FileOutcome::Empty => {
                self.append_line("WARNING", &format!("CSV file is empty: {}", ctx.path.display()))
            }
            FileOutcome::Failed { .. } => {}
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(
            "ERROR",
            &format!("Import failed severity={severity:?} path={} err={error}", ctx.path.display()),
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(
            "CRITICAL",
            &format!("ALERT severity={severity:?} path={} err={error}", ctx.path.display()),
        );
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f").to_string()
}
