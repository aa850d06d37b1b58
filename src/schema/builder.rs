//! Table definitions from sanitized headers and inferred types.

use std::fmt;

use csv::StringRecord;
use tracing::debug;

use crate::error::IngestionResult;
use crate::store::Store;
use crate::types::{ColumnDescriptor, TableDefinition};

use super::infer::{default_inferencer, ColumnInferencer};
use super::sanitize::{sanitize_headers, sanitize_table_name};

/// Result of [`SchemaBuilder::ensure_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredTable {
    /// Definition rows should be coerced and inserted with.
    pub definition: TableDefinition,
    /// `true` if the table was created by this call, `false` if it already existed.
    pub created: bool,
}

/// Builds [`TableDefinition`]s from a CSV header plus sampled rows, and creates them in a
/// [`Store`].
///
/// The inference strategy is a plain function value (see [`ColumnInferencer`]).
#[derive(Clone)]
pub struct SchemaBuilder {
    inferencer: ColumnInferencer,
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder").finish_non_exhaustive()
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new(default_inferencer())
    }
}

impl SchemaBuilder {
    /// Create a builder using `inferencer` to type columns.
    pub fn new(inferencer: ColumnInferencer) -> Self {
        Self { inferencer }
    }

    /// Describe a table for `headers`, inferring each column's type from `samples`.
    ///
    /// `samples` are data rows aligned positionally with `headers`. Cells missing from a short
    /// sample row are ignored.
    pub fn describe(
        &self,
        table_name: &str,
        headers: &[&str],
        samples: &[StringRecord],
    ) -> TableDefinition {
        let names = sanitize_headers(headers.iter().copied());
        let columns = headers
            .iter()
            .zip(names)
            .enumerate()
            .map(|(idx, (raw, sanitized))| {
                let values: Vec<&str> = samples.iter().filter_map(|row| row.get(idx)).collect();
                let inferred = (self.inferencer)(values.as_slice());
                ColumnDescriptor::new(*raw, sanitized, inferred)
            })
            .collect();

        TableDefinition::new(sanitize_table_name(table_name), columns)
    }

    /// Make sure `definition.name` exists in the store.
    ///
    /// A missing table is created from `definition`. An existing table is left untouched and
    /// is not validated against `definition`; columns it already declares keep their declared
    /// type in the returned definition so values are coerced the way the table stores them.
    pub fn ensure_table(
        &self,
        store: &Store,
        definition: TableDefinition,
    ) -> IngestionResult<EnsuredTable> {
        if !store.table_exists(&definition.name)? {
            store.create_table(&definition)?;
            return Ok(EnsuredTable {
                definition,
                created: true,
            });
        }

        let existing = store.table_columns(&definition.name)?;
        debug!(table = %definition.name, columns = existing.len(), "table already exists; schema left unchanged");

        let columns = definition
            .columns
            .into_iter()
            .map(|mut col| {
                let declared = existing
                    .iter()
                    .find(|(name, _)| *name == col.sanitized_name)
                    .and_then(|(_, t)| *t);
                if let Some(t) = declared {
                    col.inferred_type = t;
                }
                col
            })
            .collect();

        Ok(EnsuredTable {
            definition: TableDefinition::new(definition.name, columns),
            created: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::ColumnType;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn describe_sanitizes_names_and_infers_types() {
        let builder = SchemaBuilder::default();
        let def = builder.describe(
            "Run 42",
            &["Sample ID", "Temperature (°C)", "1st_Reading"],
            &[record(&["S001", "25.3", "10"]), record(&["S002", "26", "11"])],
        );

        assert_eq!(def.name, "run_42");
        assert_eq!(
            def.column_names().collect::<Vec<_>>(),
            vec!["sample_id", "temperature_c", "col_1st_reading"]
        );
        let types: Vec<ColumnType> = def.columns.iter().map(|c| c.inferred_type).collect();
        assert_eq!(types, vec![ColumnType::Text, ColumnType::Real, ColumnType::Integer]);
        assert_eq!(def.columns[1].raw_name, "Temperature (°C)");
    }

    #[test]
    fn describe_without_samples_defaults_to_text() {
        let def = SchemaBuilder::default().describe("t", &["a", "b"], &[]);
        assert!(def.columns.iter().all(|c| c.inferred_type == ColumnType::Text));
    }

    #[test]
    fn describe_uses_injected_inferencer() {
        let builder = SchemaBuilder::new(Arc::new(|_: &[&str]| ColumnType::Real));
        let def = builder.describe("t", &["a"], &[record(&["x"])]);
        assert_eq!(def.columns[0].inferred_type, ColumnType::Real);
    }

    #[test]
    fn ensure_table_creates_once_and_keeps_existing_types() {
        let store = Store::open_in_memory().unwrap();
        let builder = SchemaBuilder::default();

        let first = builder.describe("readings", &["value"], &[record(&["1"])]);
        let ensured = builder.ensure_table(&store, first).unwrap();
        assert!(ensured.created);
        assert_eq!(ensured.definition.columns[0].inferred_type, ColumnType::Integer);

        // A later file samples text for the same column; the table keeps INTEGER.
        let second = builder.describe("readings", &["value"], &[record(&["abc"])]);
        let ensured = builder.ensure_table(&store, second).unwrap();
        assert!(!ensured.created);
        assert_eq!(ensured.definition.columns[0].inferred_type, ColumnType::Integer);
    }
}
