//! SQLite-backed relational store.
//!
//! Tables are created `STRICT`, so a value that cannot be stored losslessly in its declared
//! column type is rejected at insert time instead of being silently kept as text.

use std::path::Path;

use rusqlite::{params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{
    ColumnType, TableDefinition, Value, ID_COLUMN, IMPORT_TIMESTAMP_COLUMN, SOURCE_FILE_COLUMN,
};

/// Location string that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// A single open connection to the target database.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database at `location`. [`IN_MEMORY`] opens an in-memory database.
    pub fn open(location: impl AsRef<Path>) -> IngestionResult<Self> {
        let location = location.as_ref();
        let conn = if location == Path::new(IN_MEMORY) {
            Connection::open_in_memory()?
        } else {
            Connection::open(location)?
        };
        info!(database = %location.display(), "connected to database");
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> IngestionResult<Self> {
        Self::open(IN_MEMORY)
    }

    /// Close the connection, reporting any error SQLite raises while finalizing.
    pub fn close(self) -> IngestionResult<()> {
        self.conn.close().map_err(|(_, e)| IngestionError::Store(e))?;
        info!("database connection closed");
        Ok(())
    }

    /// Borrow the underlying connection, e.g. to query imported tables.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns `true` if a table named `name` exists.
    pub fn table_exists(&self, name: &str) -> IngestionResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Declared columns of `name`, in table order, excluding the implicit id and metadata columns.
    ///
    /// Declared types outside `INTEGER`/`REAL`/`TEXT` are reported as `None`.
    pub fn table_columns(&self, name: &str) -> IngestionResult<Vec<(String, Option<ColumnType>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let rows = stmt.query_map([name], |row| {
            let col: String = row.get(0)?;
            let decl: String = row.get(1)?;
            Ok((col, ColumnType::from_sql_type(&decl)))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (col, ty) = row?;
            if col != ID_COLUMN && col != IMPORT_TIMESTAMP_COLUMN && col != SOURCE_FILE_COLUMN {
                out.push((col, ty));
            }
        }
        Ok(out)
    }

    /// Create the table described by `definition` if it does not exist yet.
    pub fn create_table(&self, definition: &TableDefinition) -> IngestionResult<()> {
        let ddl = create_table_sql(definition);
        debug!(sql = %ddl, "create table");
        self.conn.execute_batch(&ddl)?;
        info!(table = %definition.name, columns = definition.columns.len(), "table created");
        Ok(())
    }

    /// Number of rows currently stored in `table`.
    pub fn row_count(&self, table: &str) -> IngestionResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let n: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    /// Compile `sql` without executing it. Fails if it references unknown tables or columns.
    pub fn check_statement(&self, sql: &str) -> IngestionResult<()> {
        self.conn.prepare_cached(sql)?;
        Ok(())
    }

    /// Insert all `rows` with `sql` inside one transaction.
    ///
    /// Either every row is committed or none is.
    pub fn insert_group(&mut self, sql: &str, rows: &[Vec<Value>]) -> rusqlite::Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(sql)?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()
    }

    /// Insert `rows` one statement at a time inside one transaction, keeping the rows that succeed.
    ///
    /// Returns the index (into `rows`) and error of every rejected row.
    pub fn insert_each(
        &mut self,
        sql: &str,
        rows: &[Vec<Value>],
    ) -> rusqlite::Result<Vec<(usize, rusqlite::Error)>> {
        let tx = self.conn.transaction()?;
        let mut rejected = Vec::new();
        {
            let mut stmt = tx.prepare_cached(sql)?;
            for (idx, row) in rows.iter().enumerate() {
                if let Err(e) = stmt.execute(params_from_iter(row.iter())) {
                    rejected.push((idx, e));
                }
            }
        }
        tx.commit()?;
        Ok(rejected)
    }
}

/// Double-quote an identifier for SQLite.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` statement for `definition`.
pub fn create_table_sql(definition: &TableDefinition) -> String {
    let mut columns = Vec::with_capacity(definition.columns.len() + 3);
    columns.push(format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote_ident(ID_COLUMN)));
    for col in &definition.columns {
        columns.push(format!(
            "{} {}",
            quote_ident(&col.sanitized_name),
            col.inferred_type.sql_type()
        ));
    }
    columns.push(format!("{} TEXT NOT NULL", quote_ident(IMPORT_TIMESTAMP_COLUMN)));
    columns.push(format!("{} TEXT NOT NULL", quote_ident(SOURCE_FILE_COLUMN)));

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) STRICT",
        quote_ident(&definition.name),
        columns.join(", ")
    )
}

/// `INSERT` statement binding every data column of `definition` followed by the two metadata
/// columns.
pub fn insert_sql(definition: &TableDefinition) -> String {
    let names: Vec<String> = definition
        .column_names()
        .chain([IMPORT_TIMESTAMP_COLUMN, SOURCE_FILE_COLUMN])
        .map(quote_ident)
        .collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&definition.name),
        names.join(", "),
        placeholders.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnDescriptor;

    fn readings() -> TableDefinition {
        TableDefinition::new(
            "readings",
            vec![
                ColumnDescriptor::new("Sample ID", "sample_id", ColumnType::Text),
                ColumnDescriptor::new("Value", "value", ColumnType::Integer),
            ],
        )
    }

    fn row(sample: &str, value: Value) -> Vec<Value> {
        vec![
            Value::Text(sample.to_string()),
            value,
            Value::Text("2024-01-01 00:00:00".to_string()),
            Value::Text("readings.csv".to_string()),
        ]
    }

    #[test]
    fn ddl_contains_id_data_and_metadata_columns() {
        let ddl = create_table_sql(&readings());
        assert_eq!(
            ddl,
            "CREATE TABLE IF NOT EXISTS \"readings\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"sample_id\" TEXT, \"value\" INTEGER, \"import_timestamp\" TEXT NOT NULL, \
             \"source_file\" TEXT NOT NULL) STRICT"
        );
    }

    #[test]
    fn insert_sql_binds_metadata_last() {
        assert_eq!(
            insert_sql(&readings()),
            "INSERT INTO \"readings\" (\"sample_id\", \"value\", \"import_timestamp\", \"source_file\") \
             VALUES (?1, ?2, ?3, ?4)"
        );
    }

    #[test]
    fn table_introspection_skips_implicit_columns() {
        let store = Store::open_in_memory().unwrap();
        assert!(!store.table_exists("readings").unwrap());
        store.create_table(&readings()).unwrap();
        assert!(store.table_exists("readings").unwrap());
        assert_eq!(
            store.table_columns("readings").unwrap(),
            vec![
                ("sample_id".to_string(), Some(ColumnType::Text)),
                ("value".to_string(), Some(ColumnType::Integer)),
            ]
        );
    }

    #[test]
    fn insert_group_is_all_or_nothing() {
        let mut store = Store::open_in_memory().unwrap();
        let def = readings();
        store.create_table(&def).unwrap();
        let sql = insert_sql(&def);

        let rows = vec![
            row("S1", Value::Integer(1)),
            row("S2", Value::Text("oops".to_string())),
        ];
        assert!(store.insert_group(&sql, &rows).is_err());
        assert_eq!(store.row_count("readings").unwrap(), 0);

        let rejected = store.insert_each(&sql, &rows).unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, 1);
        assert_eq!(store.row_count("readings").unwrap(), 1);
    }

    #[test]
    fn check_statement_rejects_unknown_columns() {
        let store = Store::open_in_memory().unwrap();
        store.create_table(&readings()).unwrap();
        let other = TableDefinition::new(
            "readings",
            vec![ColumnDescriptor::new("Other", "other", ColumnType::Text)],
        );
        assert!(store.check_statement(&insert_sql(&other)).is_err());
        assert!(store.check_statement(&insert_sql(&readings())).is_ok());
    }
}
