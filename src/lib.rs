//! `instrument-csv-import` loads delimited instrument exports into SQLite without a predefined
//! schema.
//!
//! For every file, the header row is sanitized into column identifiers, the first data rows are
//! sampled to infer a storage type per column, a table is created on first import, and rows are
//! streamed into it in fixed-size insert groups. Each stored row also carries its import
//! timestamp and source file name.
//!
//! The primary entrypoint is [`ingestion::Importer`].
//!
//! ## What gets created
//!
//! For a file `run_01.csv`:
//!
//! ```text
//! Sample ID,Temperature (°C),1st_Reading
//! S001,25.3,10
//! ```
//!
//! the importer creates (unless it already exists):
//!
//! ```sql
//! CREATE TABLE "run_01" (
//!     "id" INTEGER PRIMARY KEY AUTOINCREMENT,
//!     "sample_id" TEXT,
//!     "temperature_c" REAL,
//!     "col_1st_reading" INTEGER,
//!     "import_timestamp" TEXT NOT NULL,
//!     "source_file" TEXT NOT NULL
//! ) STRICT
//! ```
//!
//! ## Quick example
//!
//! ```no_run
//! use instrument_csv_import::ingestion::{ImportOptions, Importer};
//!
//! # fn main() -> Result<(), instrument_csv_import::IngestionError> {
//! let mut importer = Importer::new("lab.db", ImportOptions::default())?;
//! importer.connect()?;
//!
//! let one = importer.import_one("exports/run_01.csv", None)?;
//! let many = importer.import_many("exports/", Some("run_*.csv"), Some("runs"))?;
//! println!("{one}\n{many}");
//!
//! importer.disconnect()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom type inference
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use instrument_csv_import::ingestion::{ImportOptions, Importer};
//! use instrument_csv_import::types::ColumnType;
//!
//! let opts = ImportOptions {
//!     // Store everything as text.
//!     inferencer: Arc::new(|_: &[&str]| ColumnType::Text),
//!     ..Default::default()
//! };
//! let importer = Importer::new(":memory:", opts).unwrap();
//! assert!(!importer.is_connected());
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: importer, batch loader, CSV source and observers
//! - [`schema`]: name sanitization, type inference and table creation
//! - [`store`]: SQLite wrapper
//! - [`types`]: column/table descriptions, cell values and import statistics
//! - [`config`]: defaults and JSON config files
//! - [`error`]: error type

pub mod config;
pub mod error;
pub mod ingestion;
pub mod schema;
pub mod store;
pub mod types;

pub use error::{IngestionError, IngestionResult};
