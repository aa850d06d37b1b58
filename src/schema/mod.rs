//! Schema discovery: header sanitization, column type inference and table creation.
//!
//! - [`sanitize`]: raw header text to safe, unique identifiers
//! - [`infer`]: sampled values to a single [`crate::types::ColumnType`]
//! - [`builder`]: combines both into a [`crate::types::TableDefinition`] and creates it

pub mod builder;
pub mod infer;
pub mod sanitize;

pub use builder::{EnsuredTable, SchemaBuilder};
pub use infer::{classify_value, default_inferencer, infer_column_type, ColumnInferencer};
pub use sanitize::{sanitize_column_name, sanitize_headers, sanitize_identifier, sanitize_table_name};
