//! Batch loading of CSV rows into the store.
//!
//! Rows are read one at a time from a [`CsvSource`] and buffered until `batch_size` rows are
//! pending; each full buffer is inserted as one transaction. If that transaction fails, the same
//! rows are inserted again one statement at a time so only the offending rows are dropped.
//! At most `max(batch_size, sample size)` rows are held in memory.

use std::io::Read;
use std::path::Path;

use chrono::Utc;
use csv::StringRecord;
use tracing::debug;

use crate::error::IngestionResult;
use crate::store::{insert_sql, Store};
use crate::types::{RowError, TableDefinition, Value};

use super::csv::{CsvSource, SourceRow};
use super::observability::{IngestionContext, IngestionObserver};

/// Rows read ahead of table creation so their values can drive type inference.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sample {
    /// Data row number of each record.
    pub row_numbers: Vec<usize>,
    /// Well-formed records, in file order.
    pub records: Vec<StringRecord>,
}

impl Sample {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Counters and failures collected while loading one file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadStats {
    pub total_rows_seen: usize,
    pub imported_rows: usize,
    pub skipped_rows: usize,
    /// Skipped rows with a reason, ordered by row number.
    pub errors: Vec<RowError>,
}

/// Streams one file's rows into one table.
pub struct BatchLoader<'a> {
    store: &'a mut Store,
    observer: &'a dyn IngestionObserver,
    ctx: &'a IngestionContext,
    batch_size: usize,
    source_file: String,
    stats: LoadStats,
}

impl<'a> BatchLoader<'a> {
    /// Create a loader for the file described by `ctx`.
    ///
    /// `batch_size` is clamped to at least 1.
    pub fn new(
        store: &'a mut Store,
        observer: &'a dyn IngestionObserver,
        ctx: &'a IngestionContext,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            observer,
            ctx,
            batch_size: batch_size.max(1),
            source_file: source_file_name(&ctx.path),
            stats: LoadStats::default(),
        }
    }

    /// Store the loader writes into.
    pub fn store(&self) -> &Store {
        &*self.store
    }

    /// Value written to the `source_file` column.
    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    /// Row errors recorded so far. Blank rows are skipped without one.
    pub fn errors_recorded(&self) -> usize {
        self.stats.errors.len()
    }

    /// Read up to `limit` well-formed rows. Malformed and blank rows met on the way are skipped
    /// and counted as usual.
    pub fn read_sample<R: Read>(
        &mut self,
        source: &mut CsvSource<R>,
        limit: usize,
    ) -> IngestionResult<Sample> {
        let mut sample = Sample::default();
        while sample.len() < limit {
            let Some(next) = source.next_row() else {
                break;
            };
            if let Some((row_number, record)) = self.accept(next?) {
                sample.row_numbers.push(row_number);
                sample.records.push(record);
            }
        }
        Ok(sample)
    }

    /// Insert `sample` and then every remaining row of `source` into `table`.
    ///
    /// Rows are positionally aligned with `table.columns`. Fails without inserting anything if
    /// the insert statement does not compile against the existing table.
    pub fn load<R: Read>(
        &mut self,
        source: &mut CsvSource<R>,
        table: &TableDefinition,
        sample: Sample,
    ) -> IngestionResult<()> {
        let sql = insert_sql(table);
        debug!(sql = %sql, "insert statement");
        self.store.check_statement(&sql)?;

        let mut batch: Vec<(usize, StringRecord)> = Vec::with_capacity(self.batch_size);
        for row in sample.row_numbers.into_iter().zip(sample.records) {
            batch.push(row);
            if batch.len() >= self.batch_size {
                self.flush(&sql, table, &mut batch)?;
            }
        }

        while let Some(next) = source.next_row() {
            if let Some(row) = self.accept(next?) {
                batch.push(row);
                if batch.len() >= self.batch_size {
                    self.flush(&sql, table, &mut batch)?;
                }
            }
        }

        self.flush(&sql, table, &mut batch)
    }

    /// Consume the loader and return what it recorded.
    pub fn finish(mut self) -> LoadStats {
        self.stats.errors.sort_by_key(|e| e.row_number);
        self.stats
    }

    fn accept(&mut self, row: SourceRow) -> Option<(usize, StringRecord)> {
        self.stats.total_rows_seen += 1;
        match row {
            SourceRow::Data { row_number, record } => Some((row_number, record)),
            SourceRow::Blank { .. } => {
                self.stats.skipped_rows += 1;
                None
            }
            SourceRow::Malformed { row_number, reason } => {
                self.skip(row_number, reason);
                None
            }
        }
    }

    fn skip(&mut self, row_number: usize, reason: String) {
        let error = RowError::row(self.source_file.clone(), row_number, reason);
        self.observer.on_row_skipped(self.ctx, &error);
        self.stats.skipped_rows += 1;
        self.stats.errors.push(error);
    }

    fn flush(
        &mut self,
        sql: &str,
        table: &TableDefinition,
        batch: &mut Vec<(usize, StringRecord)>,
    ) -> IngestionResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let imported_at = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let rows: Vec<Vec<Value>> = batch
            .iter()
            .map(|(_, record)| row_values(table, record, &imported_at, &self.source_file))
            .collect();

        let committed = match self.store.insert_group(sql, &rows) {
            Ok(()) => rows.len(),
            Err(e) => {
                debug!(err = %e, rows = rows.len(), "group insert failed; retrying row by row");
                let rejected = self.store.insert_each(sql, &rows)?;
                let n_rejected = rejected.len();
                for (idx, err) in rejected {
                    let row_number = batch[idx].0;
                    self.skip(row_number, format!("rejected by store: {err}"));
                }
                rows.len() - n_rejected
            }
        };

        self.stats.imported_rows += committed;
        self.observer
            .on_batch_committed(self.ctx, committed, self.stats.imported_rows);
        batch.clear();
        Ok(())
    }
}

/// Coerce one record to the table's column types and append the metadata values.
pub fn row_values(
    table: &TableDefinition,
    record: &StringRecord,
    imported_at: &str,
    source_file: &str,
) -> Vec<Value> {
    let mut values: Vec<Value> = record
        .iter()
        .zip(&table.columns)
        .map(|(raw, col)| col.inferred_type.coerce(raw))
        .collect();
    values.push(Value::Text(imported_at.to_owned()));
    values.push(Value::Text(source_file.to_owned()));
    values
}

/// Base name of `path`, as stored in the `source_file` column.
pub fn source_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
