//! Core data model types for CSV import.
//!
//! A CSV file is described by a [`TableDefinition`] (an ordered list of [`ColumnDescriptor`]s
//! with inferred [`ColumnType`]s). Cells are converted to typed [`Value`]s before they are bound
//! into the store, and every import run reports an [`ImportStats`].

use std::fmt;
use std::path::PathBuf;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Storage type inferred for a column.
///
/// Variants are ordered from most to least specific: `Integer ⊂ Real ⊂ Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point number.
    Real,
    /// UTF-8 text.
    Text,
}

impl ColumnType {
    /// SQL type name used in `CREATE TABLE`.
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }

    /// Parse a declared SQL type (as reported by `PRAGMA table_info`), case-insensitive.
    pub fn from_sql_type(decl: &str) -> Option<Self> {
        match decl.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" => Some(Self::Integer),
            "REAL" | "FLOAT" | "DOUBLE" => Some(Self::Real),
            "TEXT" => Some(Self::Text),
            _ => None,
        }
    }

    /// Convert a raw CSV cell into a [`Value`] for this column type.
    ///
    /// Empty and whitespace-only cells become [`Value::Null`]. A cell that does not parse for a
    /// numeric column is kept as [`Value::Text`] so the store can reject it.
    pub fn coerce(self, raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }

        match self {
            Self::Integer => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(raw.to_owned())),
            Self::Real => match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => Value::Real(v),
                _ => Value::Text(raw.to_owned()),
            },
            Self::Text => Value::Text(raw.to_owned()),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_type())
    }
}

/// A single CSV column as it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Header text as it appeared in the CSV.
    pub raw_name: String,
    /// Identifier used in the store: non-empty, `[a-z0-9_]`, never starts with a digit.
    pub sanitized_name: String,
    /// Inferred (or, for existing tables, declared) storage type.
    pub inferred_type: ColumnType,
}

impl ColumnDescriptor {
    pub fn new(
        raw_name: impl Into<String>,
        sanitized_name: impl Into<String>,
        inferred_type: ColumnType,
    ) -> Self {
        Self {
            raw_name: raw_name.into(),
            sanitized_name: sanitized_name.into(),
            inferred_type,
        }
    }
}

/// Name of the auto-assigned row identifier column.
pub const ID_COLUMN: &str = "id";
/// Name of the metadata column holding the import timestamp.
pub const IMPORT_TIMESTAMP_COLUMN: &str = "import_timestamp";
/// Name of the metadata column holding the source file name.
pub const SOURCE_FILE_COLUMN: &str = "source_file";

/// Column names every table carries regardless of the CSV header.
pub const RESERVED_COLUMNS: [&str; 3] = [ID_COLUMN, IMPORT_TIMESTAMP_COLUMN, SOURCE_FILE_COLUMN];

/// A table in the store: ordered data columns plus the implicit id and metadata columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    /// Sanitized table name.
    pub name: String,
    /// Data columns in CSV header order.
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Iterate sanitized column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.sanitized_name.as_str())
    }
}

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 string.
    Text(String),
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(v) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*v)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Value::Null),
            ValueRef::Integer(v) => Ok(Value::Integer(v)),
            ValueRef::Real(v) => Ok(Value::Real(v)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| Value::Text(s.to_owned()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

/// A recorded failure: a skipped row (with its row number) or a failed file (without one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// Base name of the file the failure belongs to.
    pub source_file: String,
    /// 1-based data row number (the header is not counted). `None` for file-level failures.
    pub row_number: Option<usize>,
    /// Human-readable reason.
    pub reason: String,
}

impl RowError {
    pub fn row(source_file: impl Into<String>, row_number: usize, reason: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            row_number: Some(row_number),
            reason: reason.into(),
        }
    }

    pub fn file(source_file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            row_number: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row_number {
            Some(row) => write!(f, "{} row {}: {}", self.source_file, row, self.reason),
            None => write!(f, "{}: {}", self.source_file, self.reason),
        }
    }
}

/// How a single file import ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// The file was read to the end. Individual rows may still have been skipped.
    Imported,
    /// The file had no data rows (zero bytes, blank, or header only). Nothing was written.
    Empty,
    /// The file could not be imported at all.
    Failed { reason: String },
}

/// Per-file result, kept in [`ImportStats::files`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Target table, once it is known.
    pub table: Option<String>,
    pub outcome: FileOutcome,
    pub total_rows_seen: usize,
    pub imported_rows: usize,
    pub skipped_rows: usize,
}

impl FileReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: None,
            outcome: FileOutcome::Imported,
            total_rows_seen: 0,
            imported_rows: 0,
            skipped_rows: 0,
        }
    }
}

/// Statistics for one invocation (a single file or a directory sweep).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Data rows read from all files (excluding headers).
    pub total_rows_seen: usize,
    /// Rows committed to the store.
    pub imported_rows: usize,
    /// Rows read but not committed (malformed, blank or rejected by the store).
    pub skipped_rows: usize,
    /// Row-level and file-level failures, in the order they happened.
    pub errors: Vec<RowError>,
    /// One report per attempted file.
    pub files: Vec<FileReport>,
}

impl ImportStats {
    /// Number of files attempted (imported, empty or failed).
    pub fn files_processed(&self) -> usize {
        self.files.len()
    }

    /// Number of files that ended in [`FileOutcome::Empty`].
    pub fn empty_files(&self) -> usize {
        self.count_outcomes(|o| matches!(o, FileOutcome::Empty))
    }

    /// Number of files that ended in [`FileOutcome::Failed`].
    pub fn failed_files(&self) -> usize {
        self.count_outcomes(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    fn count_outcomes(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }

    /// Fold another run's statistics into this one.
    pub fn merge(&mut self, other: ImportStats) {
        self.total_rows_seen += other.total_rows_seen;
        self.imported_rows += other.imported_rows;
        self.skipped_rows += other.skipped_rows;
        self.errors.extend(other.errors);
        self.files.extend(other.files);
    }
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "{rule}")?;
        writeln!(f, "IMPORT SUMMARY")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Files Processed: {}", self.files_processed())?;
        writeln!(f, "Empty Files: {}", self.empty_files())?;
        writeln!(f, "Failed Files: {}", self.failed_files())?;
        writeln!(f, "Total Rows: {}", self.total_rows_seen)?;
        writeln!(f, "Imported Rows: {}", self.imported_rows)?;
        writeln!(f, "Skipped Rows: {}", self.skipped_rows)?;
        writeln!(f, "Errors: {}", self.errors.len())?;
        for file in &self.files {
            let table = file.table.as_deref().unwrap_or("-");
            match &file.outcome {
                FileOutcome::Imported => writeln!(
                    f,
                    "  {} -> {}: {} imported, {} skipped",
                    file.path.display(),
                    table,
                    file.imported_rows,
                    file.skipped_rows
                )?,
                FileOutcome::Empty => writeln!(f, "  {}: empty file", file.path.display())?,
                FileOutcome::Failed { reason } => {
                    writeln!(f, "  {}: failed ({reason})", file.path.display())?
                }
            }
        }
        for err in &self.errors {
            writeln!(f, "  error: {err}")?;
        }
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_maps_blank_cells_to_null() {
        assert_eq!(ColumnType::Integer.coerce(""), Value::Null);
        assert_eq!(ColumnType::Real.coerce("   "), Value::Null);
        assert_eq!(ColumnType::Text.coerce(""), Value::Null);
    }

    #[test]
    fn coerce_parses_numeric_columns() {
        assert_eq!(ColumnType::Integer.coerce(" 42 "), Value::Integer(42));
        assert_eq!(ColumnType::Real.coerce("25.3"), Value::Real(25.3));
        assert_eq!(ColumnType::Real.coerce("10"), Value::Real(10.0));
    }

    #[test]
    fn coerce_keeps_unparseable_cells_as_text() {
        assert_eq!(
            ColumnType::Integer.coerce("1.5"),
            Value::Text("1.5".to_string())
        );
        assert_eq!(
            ColumnType::Real.coerce("NaN"),
            Value::Text("NaN".to_string())
        );
        assert_eq!(
            ColumnType::Text.coerce(" S001 "),
            Value::Text(" S001 ".to_string())
        );
    }

    #[test]
    fn from_sql_type_round_trips_declared_types() {
        for t in [ColumnType::Integer, ColumnType::Real, ColumnType::Text] {
            assert_eq!(ColumnType::from_sql_type(t.sql_type()), Some(t));
        }
        assert_eq!(ColumnType::from_sql_type("integer"), Some(ColumnType::Integer));
        assert_eq!(ColumnType::from_sql_type("BLOB"), None);
    }

    #[test]
    fn merge_sums_counters_and_concatenates_lists() {
        let mut total = ImportStats::default();
        let mut a = ImportStats {
            total_rows_seen: 5,
            imported_rows: 4,
            skipped_rows: 1,
            errors: vec![RowError::row("a.csv", 3, "field count mismatch")],
            files: vec![FileReport::new("a.csv")],
        };
        a.files[0].imported_rows = 4;
        let mut b = ImportStats::default();
        let mut empty = FileReport::new("b.csv");
        empty.outcome = FileOutcome::Empty;
        b.files.push(empty);

        total.merge(a);
        total.merge(b);

        assert_eq!(total.total_rows_seen, 5);
        assert_eq!(total.imported_rows, 4);
        assert_eq!(total.skipped_rows, 1);
        assert_eq!(total.errors.len(), 1);
        assert_eq!(total.files_processed(), 2);
        assert_eq!(total.empty_files(), 1);
        assert_eq!(total.failed_files(), 0);
    }

    #[test]
    fn summary_lists_files_and_errors() {
        let mut stats = ImportStats::default();
        let mut failed = FileReport::new("broken.csv");
        failed.outcome = FileOutcome::Failed {
            reason: "no header row".to_string(),
        };
        stats.files.push(failed);
        stats.errors.push(RowError::file("broken.csv", "no header row"));

        let text = stats.to_string();
        assert!(text.contains("IMPORT SUMMARY"));
        assert!(text.contains("Failed Files: 1"));
        assert!(text.contains("broken.csv: failed (no header row)"));
        assert!(text.contains("error: broken.csv: no header row"));
    }
}
