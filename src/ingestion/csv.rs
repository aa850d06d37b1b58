//! CSV source: header extraction and row classification.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::error::{IngestionError, IngestionResult};

const BOM: char = '\u{feff}';

/// One data row read from a [`CsvSource`], classified against the header.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRow {
    /// A row with exactly one field per header column.
    Data { row_number: usize, record: StringRecord },
    /// A row whose fields are all empty.
    Blank { row_number: usize },
    /// A row that cannot be aligned with the header (wrong field count, undecodable bytes).
    Malformed { row_number: usize, reason: String },
}

impl SourceRow {
    /// 1-based data row number (the header is not counted).
    pub fn row_number(&self) -> usize {
        match self {
            Self::Data { row_number, .. }
            | Self::Blank { row_number }
            | Self::Malformed { row_number, .. } => *row_number,
        }
    }
}

/// Streaming reader over a headed, comma-delimited file.
///
/// Rules:
///
/// - the first non-empty line is the header; a leading UTF-8 byte-order mark is dropped
/// - completely empty lines are skipped by the reader and never numbered
/// - rows may have any number of fields; mismatches are reported as [`SourceRow::Malformed`]
#[derive(Debug)]
pub struct CsvSource<R> {
    rdr: csv::Reader<R>,
    headers: Vec<String>,
    rows_read: usize,
}

impl CsvSource<File> {
    /// Open `path` for streaming.
    ///
    /// Returns `Ok(None)` if the file holds no header and no data (zero bytes or blank).
    pub fn from_path(path: impl AsRef<Path>) -> IngestionResult<Option<Self>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IngestionError::NotFound {
                path: path.to_path_buf(),
            },
            _ => IngestionError::Io(e),
        })?;
        Self::from_reader(file, path)
    }
}

impl<R: Read> CsvSource<R> {
    /// Wrap an arbitrary reader. `path` is only used in error messages.
    ///
    /// Returns `Ok(None)` if the input holds no header and no data. A header whose cells are
    /// all blank followed by data rows is an [`IngestionError::MissingHeader`].
    pub fn from_reader(reader: R, path: impl Into<PathBuf>) -> IngestionResult<Option<Self>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
        if let Some(first) = headers.first_mut() {
            if first.starts_with(BOM) {
                *first = first.trim_start_matches(BOM).to_owned();
            }
        }

        let mut source = Self {
            rdr,
            headers,
            rows_read: 0,
        };

        if source.headers.iter().all(|h| h.trim().is_empty()) {
            let mut record = StringRecord::new();
            return match source.rdr.read_record(&mut record) {
                Ok(false) => Ok(None),
                Err(e) if e.is_io_error() => Err(e.into()),
                // Any further row, readable or not, means data without a header.
                Ok(true) | Err(_) => Err(IngestionError::MissingHeader { path: path.into() }),
            };
        }

        Ok(Some(source))
    }

    /// Raw header cells, in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Read and classify the next data row.
    ///
    /// Returns `None` at end of input, and `Some(Err(_))` if the underlying reader fails with an
    /// I/O error (the file cannot be read further).
    pub fn next_row(&mut self) -> Option<IngestionResult<SourceRow>> {
        let mut record = StringRecord::new();
        match self.rdr.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) if e.is_io_error() => return Some(Err(e.into())),
            Err(e) => {
                self.rows_read += 1;
                return Some(Ok(SourceRow::Malformed {
                    row_number: self.rows_read,
                    reason: format!("unreadable row: {e}"),
                }));
            }
        }

        self.rows_read += 1;
        let row_number = self.rows_read;

        if record.iter().all(|field| field.trim().is_empty()) {
            return Some(Ok(SourceRow::Blank { row_number }));
        }
        if record.len() != self.headers.len() {
            return Some(Ok(SourceRow::Malformed {
                row_number,
                reason: format!(
                    "expected {} fields, found {}",
                    self.headers.len(),
                    record.len()
                ),
            }));
        }
        Some(Ok(SourceRow::Data { row_number, record }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(input: &str) -> IngestionResult<Option<CsvSource<&[u8]>>> {
        CsvSource::from_reader(input.as_bytes(), "test.csv")
    }

    fn drain(mut src: CsvSource<&[u8]>) -> Vec<SourceRow> {
        let mut out = Vec::new();
        while let Some(row) = src.next_row() {
            out.push(row.unwrap());
        }
        out
    }

    #[test]
    fn empty_input_has_no_source() {
        assert!(source("").unwrap().is_none());
        assert!(source("\n\n").unwrap().is_none());
        assert!(source("  \n").unwrap().is_none());
    }

    #[test]
    fn header_only_has_no_data() {
        let src = source("a,b,c\n").unwrap().unwrap();
        assert_eq!(src.headers(), ["a", "b", "c"]);
        assert!(drain(src).is_empty());
    }

    #[test]
    fn blank_header_with_data_is_an_error() {
        let err = source(",,\n1,2,3\n").unwrap_err();
        assert!(matches!(err, IngestionError::MissingHeader { .. }));
    }

    #[test]
    fn strips_byte_order_mark() {
        let src = source("\u{feff}Sample ID,Value\nS1,1\n").unwrap().unwrap();
        assert_eq!(src.headers()[0], "Sample ID");
        assert_eq!(drain(src).len(), 1);
    }

    #[test]
    fn undecodable_first_row_is_numbered_and_kept() {
        let input: &[u8] = b"a,b\n\xff\xfe,1\nx,2\ny,3\n";
        let rows = drain(CsvSource::from_reader(input, "test.csv").unwrap().unwrap());

        assert_eq!(rows.len(), 3);
        assert!(matches!(&rows[0], SourceRow::Malformed { row_number: 1, reason } if reason.starts_with("unreadable row")));
        assert!(matches!(&rows[1], SourceRow::Data { row_number: 2, .. }));
        assert!(matches!(&rows[2], SourceRow::Data { row_number: 3, .. }));
    }

    #[test]
    fn undecodable_row_under_blank_header_is_an_error() {
        let input: &[u8] = b",\n\xff,1\n";
        let err = CsvSource::from_reader(input, "test.csv").unwrap_err();
        assert!(matches!(err, IngestionError::MissingHeader { .. }));
    }

    #[test]
    fn classifies_rows_by_field_count() {
        let rows = drain(source("a,b\n1,2\n1,2,3\n,\n4\n5,6\n").unwrap().unwrap());
        assert_eq!(rows.len(), 5);
        assert!(matches!(&rows[0], SourceRow::Data { row_number: 1, record } if record.len() == 2));
        assert!(matches!(&rows[1], SourceRow::Malformed { row_number: 2, reason } if reason == "expected 2 fields, found 3"));
        assert_eq!(rows[2], SourceRow::Blank { row_number: 3 });
        assert!(matches!(&rows[3], SourceRow::Malformed { row_number: 4, .. }));
        assert_eq!(rows[4].row_number(), 5);
    }

    #[test]
    fn quoted_fields_keep_embedded_commas() {
        let rows = drain(source("name,note\nS1,\"warm, stable\"\n").unwrap().unwrap());
        match &rows[0] {
            SourceRow::Data { record, .. } => assert_eq!(&record[1], "warm, stable"),
            other => panic!("unexpected row: {other:?}"),
        }
    }
}
