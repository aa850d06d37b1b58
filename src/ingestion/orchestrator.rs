//! Import orchestration: the programmatic entry point of the crate.
//!
//! An [`Importer`] owns the store connection, the schema builder and the logger handle. Callers
//! [`Importer::connect`], run any number of [`Importer::import_one`] / [`Importer::import_many`]
//! calls, and [`Importer::disconnect`].
//!
//! - File-level failures (missing file, unreadable file, no header) and row-level failures are
//!   recorded into the returned [`ImportStats`]; they never surface as `Err`.
//! - Files without data rows are reported as [`FileOutcome::Empty`].
//! - Only opening the store ([`Importer::connect`]) and calling an import while disconnected
//!   return errors.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use walkdir::WalkDir;

use crate::config::{DEFAULT_BATCH_SIZE, DEFAULT_PATTERN, DEFAULT_SAMPLE_ROWS};
use crate::error::{IngestionError, IngestionResult};
use crate::schema::{default_inferencer, sanitize_table_name, ColumnInferencer, SchemaBuilder};
use crate::store::Store;
use crate::types::{FileOutcome, FileReport, ImportStats, RowError};

use super::csv::CsvSource;
use super::loader::BatchLoader;
use super::observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity,
    TracingObserver,
};

/// A destination for the importer's log events.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSink {
    /// `tracing` events, shown by whatever subscriber the process installed.
    Console,
    /// Timestamped lines appended to a file.
    File(PathBuf),
}

/// Options controlling import behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct ImportOptions {
    /// Maximum rows per insert group. Must be at least 1.
    pub batch_size: usize,
    /// Well-formed data rows sampled per file for type inference. Must be at least 1.
    pub sample_rows: usize,
    /// Glob matched against file names in directory imports.
    pub pattern: String,
    /// Descend into subdirectories in directory imports.
    pub recursive: bool,
    /// Log sinks, in the order events are delivered to them.
    pub log_sinks: Vec<LogSink>,
    /// Extra observer receiving every event after the sinks.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
    /// Column type inference strategy.
    pub inferencer: ColumnInferencer,
}

impl fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportOptions")
            .field("batch_size", &self.batch_size)
            .field("sample_rows", &self.sample_rows)
            .field("pattern", &self.pattern)
            .field("recursive", &self.recursive)
            .field("log_sinks", &self.log_sinks)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish_non_exhaustive()
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            pattern: DEFAULT_PATTERN.to_string(),
            recursive: false,
            log_sinks: vec![LogSink::Console],
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
            inferencer: default_inferencer(),
        }
    }
}

impl ImportOptions {
    /// Reject out-of-range values.
    pub fn validate(&self) -> IngestionResult<()> {
        if self.batch_size == 0 {
            return Err(IngestionError::InvalidOptions {
                message: "batch_size must be > 0".to_string(),
            });
        }
        if self.sample_rows == 0 {
            return Err(IngestionError::InvalidOptions {
                message: "sample_rows must be > 0".to_string(),
            });
        }
        glob::Pattern::new(&self.pattern)?;
        Ok(())
    }

    fn build_observer(&self) -> Arc<dyn IngestionObserver> {
        let mut observers: Vec<Arc<dyn IngestionObserver>> = self
            .log_sinks
            .iter()
            .map(|sink| -> Arc<dyn IngestionObserver> {
                match sink {
                    LogSink::Console => Arc::new(TracingObserver),
                    LogSink::File(path) => Arc::new(FileObserver::new(path)),
                }
            })
            .collect();
        if let Some(extra) = &self.observer {
            observers.push(Arc::clone(extra));
        }
        Arc::new(CompositeObserver::new(observers))
    }
}

/// Imports CSV files into one store.
pub struct Importer {
    location: PathBuf,
    options: ImportOptions,
    schema: SchemaBuilder,
    observer: Arc<dyn IngestionObserver>,
    store: Option<Store>,
}

impl fmt::Debug for Importer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Importer")
            .field("location", &self.location)
            .field("options", &self.options)
            .field("connected", &self.store.is_some())
            .finish()
    }
}

impl Importer {
    /// Create an importer for the store at `location` (a file path, or
    /// [`crate::store::IN_MEMORY`]). Does not open the store yet.
    pub fn new(location: impl Into<PathBuf>, options: ImportOptions) -> IngestionResult<Self> {
        options.validate()?;
        Ok(Self {
            location: location.into(),
            schema: SchemaBuilder::new(Arc::clone(&options.inferencer)),
            observer: options.build_observer(),
            options,
            store: None,
        })
    }

    /// Open the store. Does nothing if already connected.
    pub fn connect(&mut self) -> IngestionResult<()> {
        if self.store.is_none() {
            self.store = Some(Store::open(&self.location)?);
        }
        Ok(())
    }

    /// Close the store. Does nothing if not connected.
    pub fn disconnect(&mut self) -> IngestionResult<()> {
        match self.store.take() {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    /// The open store, if connected.
    pub fn store(&self) -> Option<&Store> {
        self.store.as_ref()
    }

    /// Import a single file into `table_name`, or into a table named after the file stem.
    pub fn import_one(
        &mut self,
        path: impl AsRef<Path>,
        table_name: Option<&str>,
    ) -> IngestionResult<ImportStats> {
        let store = self.store.as_mut().ok_or(IngestionError::NotConnected)?;
        Ok(import_file(
            store,
            &self.schema,
            self.observer.as_ref(),
            &self.options,
            path.as_ref(),
            table_name,
        ))
    }

    /// Import every file in `dir` whose name matches `pattern` (default
    /// [`ImportOptions::pattern`]), in lexicographic path order.
    ///
    /// With `table_name` every file goes into that table; otherwise each file goes into a table
    /// named after its own stem.
    pub fn import_many(
        &mut self,
        dir: impl AsRef<Path>,
        pattern: Option<&str>,
        table_name: Option<&str>,
    ) -> IngestionResult<ImportStats> {
        let store = self.store.as_mut().ok_or(IngestionError::NotConnected)?;
        let dir = dir.as_ref();
        let pattern = pattern.unwrap_or(self.options.pattern.as_str());
        let mut stats = ImportStats::default();

        let files = match find_matching_files(dir, pattern, self.options.recursive) {
            Ok(files) => files,
            Err(e) => {
                report_failure(self.observer.as_ref(), &self.options, &IngestionContext::new(dir), &e);
                stats.errors.push(RowError::file(dir.display().to_string(), e.to_string()));
                return Ok(stats);
            }
        };

        if files.is_empty() {
            self.observer
                .on_no_matching_files(&IngestionContext::new(dir), pattern);
            return Ok(stats);
        }
        info!(dir = %dir.display(), files = files.len(), "found file(s) to process");

        for path in &files {
            stats.merge(import_file(
                store,
                &self.schema,
                self.observer.as_ref(),
                &self.options,
                path,
                table_name,
            ));
        }

        info!(
            dir = %dir.display(),
            files = stats.files_processed(),
            imported = stats.imported_rows,
            skipped = stats.skipped_rows,
            "directory import complete"
        );
        Ok(stats)
    }

    /// Import `path` with [`Self::import_many`] if it is a directory, otherwise with
    /// [`Self::import_one`].
    pub fn import_path(
        &mut self,
        path: impl AsRef<Path>,
        pattern: Option<&str>,
        table_name: Option<&str>,
    ) -> IngestionResult<ImportStats> {
        let path = path.as_ref();
        if path.is_dir() {
            self.import_many(path, pattern, table_name)
        } else {
            self.import_one(path, table_name)
        }
    }
}

/// Files directly in `dir` (or anywhere below it, if `recursive`) whose file name matches the
/// glob `pattern`, sorted by path.
pub fn find_matching_files(
    dir: &Path,
    pattern: &str,
    recursive: bool,
) -> IngestionResult<Vec<PathBuf>> {
    let matcher = glob::Pattern::new(pattern)?;
    if !dir.is_dir() {
        return Err(IngestionError::NotFound {
            path: dir.to_path_buf(),
        });
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(max_depth) {
        let entry = entry?;
        if entry.file_type().is_file() && matcher.matches(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn import_file(
    store: &mut Store,
    schema: &SchemaBuilder,
    observer: &dyn IngestionObserver,
    options: &ImportOptions,
    path: &Path,
    table_name: Option<&str>,
) -> ImportStats {
    let table = match table_name {
        Some(name) => sanitize_table_name(name),
        None => sanitize_table_name(&path.file_stem().unwrap_or_default().to_string_lossy()),
    };
    let ctx = IngestionContext {
        path: path.to_path_buf(),
        table: Some(table.clone()),
    };
    observer.on_file_started(&ctx);

    let mut loader = BatchLoader::new(store, observer, &ctx, options.batch_size);
    let outcome = load_file(&mut loader, schema, observer, &ctx, &table, options.sample_rows);
    let source_file = loader.source_file().to_owned();
    let load = loader.finish();

    let mut report = FileReport::new(path);
    report.total_rows_seen = load.total_rows_seen;
    report.imported_rows = load.imported_rows;
    report.skipped_rows = load.skipped_rows;
    let mut errors = load.errors;

    match outcome {
        Ok(true) => report.table = Some(table),
        Ok(false) => report.outcome = FileOutcome::Empty,
        Err(e) => {
            report_failure(observer, options, &ctx, &e);
            // Rows read but never committed before the failure.
            report.skipped_rows = report.total_rows_seen.saturating_sub(report.imported_rows);
            if report.imported_rows > 0 {
                report.table = Some(table);
            }
            report.outcome = FileOutcome::Failed {
                reason: e.to_string(),
            };
            errors.push(RowError::file(source_file, e.to_string()));
        }
    }
    observer.on_file_finished(&ctx, &report);

    ImportStats {
        total_rows_seen: report.total_rows_seen,
        imported_rows: report.imported_rows,
        skipped_rows: report.skipped_rows,
        errors,
        files: vec![report],
    }
}

/// Returns `Ok(false)` if the file had no data rows (blank rows do not count).
fn load_file(
    loader: &mut BatchLoader<'_>,
    schema: &SchemaBuilder,
    observer: &dyn IngestionObserver,
    ctx: &IngestionContext,
    table: &str,
    sample_rows: usize,
) -> IngestionResult<bool> {
    let Some(mut source) = CsvSource::from_path(&ctx.path)? else {
        return Ok(false);
    };

    let sample = loader.read_sample(&mut source, sample_rows)?;
    // Header only, or nothing but blank rows: no table is created from an empty sample.
    if sample.is_empty() && loader.errors_recorded() == 0 {
        return Ok(false);
    }

    let headers: Vec<&str> = source.headers().iter().map(String::as_str).collect();
    let definition = schema.describe(table, &headers, &sample.records);
    let ensured = schema.ensure_table(loader.store(), definition)?;
    observer.on_table_ready(ctx, &ensured.definition, ensured.created);

    loader.load(&mut source, &ensured.definition, sample)?;
    Ok(true)
}

fn report_failure(
    observer: &dyn IngestionObserver,
    options: &ImportOptions,
    ctx: &IngestionContext,
    error: &IngestionError,
) {
    let severity = IngestionSeverity::for_error(error);
    observer.on_failure(ctx, severity, error);
    if severity >= options.alert_at_or_above {
        observer.on_alert(ctx, severity, error);
    }
}
