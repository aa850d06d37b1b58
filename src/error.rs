use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for import operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned by the importer, the store wrapper and the CSV source.
///
/// Most of these never escape [`crate::ingestion::Importer`]: file-level and row-level failures
/// are recorded into [`crate::types::ImportStats`] instead. Only opening the store and calling an
/// import on a disconnected importer surface to the caller.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Error reported by the SQLite store.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The directory match pattern is not a valid glob.
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Directory traversal failed.
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// The input path does not exist.
    #[error("input path not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file has content but its first row carries no usable column names.
    #[error("no header row in {}", path.display())]
    MissingHeader { path: PathBuf },

    /// The importer options are out of range (e.g. a zero batch size).
    #[error("invalid options: {message}")]
    InvalidOptions { message: String },

    /// An import was attempted before [`crate::ingestion::Importer::connect`] or after
    /// [`crate::ingestion::Importer::disconnect`].
    #[error("importer is not connected to a store")]
    NotConnected,
}
