//! Ingestion pipeline.
//!
//! Most callers should use [`Importer`] (from [`orchestrator`]) which:
//!
//! - resolves a single file or a directory of files against a glob pattern
//! - discovers each file's schema and creates its table on first import
//! - streams rows into the store in fixed-size groups via [`loader::BatchLoader`]
//! - reports progress, skipped rows and failures to an [`IngestionObserver`]
//!
//! The building blocks are also available under:
//! - [`csv`]
//! - [`loader`]

pub mod csv;
pub mod loader;
pub mod observability;
pub mod orchestrator;

pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, TracingObserver,
};
pub use orchestrator::{find_matching_files, ImportOptions, Importer, LogSink};
