//! Table exports: delimited flat files and relational upserts.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params_from_iter, Connection, ErrorCode};
use thiserror::Error;
use tracing::{debug, error, info};

use super::table::Table;
use crate::metrics;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to open database {path:?}: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    FlatFile {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Table {table} has no column {column}")]
    MissingColumn { table: String, column: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Write `table` as CSV: header row from the schema, one line per row, null
/// as an empty field. An existing file is overwritten.
pub fn to_flat_file(table: &Table, path: &Path) -> Result<(), SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SinkError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let flat_file_error = |source| SinkError::FlatFile {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(flat_file_error)?;
    writer
        .write_record(table.schema().columns())
        .map_err(flat_file_error)?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(flat_file_error)?;
    }
    writer.flush().map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    metrics::record_rows_exported(table.name(), table.len());
    info!("Wrote {} rows of {} to {:?}", table.len(), table.name(), path);
    Ok(())
}

/// Where and how a table is upserted.
#[derive(Debug, Clone, Copy)]
pub struct UpsertSpec {
    pub table: &'static str,
    pub primary_key: &'static str,
    /// Columns refreshed when the primary key already exists. Every other
    /// column keeps the value from the first insert.
    pub mutable_columns: &'static [&'static str],
}

impl UpsertSpec {
    fn statement(&self, columns: &[String]) -> String {
        let column_list = columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        let on_conflict = if self.mutable_columns.is_empty() {
            "DO NOTHING".to_string()
        } else {
            let assignments = self
                .mutable_columns
                .iter()
                .map(|c| format!("{0} = excluded.{0}", quote(c)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("DO UPDATE SET {}", assignments)
        };

        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
            quote(self.table),
            column_list,
            placeholders,
            quote(self.primary_key),
            on_conflict
        )
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// A row that could not be written.
#[derive(Debug, Clone)]
pub struct RowFailure {
    pub row: usize,
    pub id: String,
    pub error: String,
}

/// Outcome of one [`upsert`] call.
#[derive(Debug, Clone, Default)]
pub struct UpsertReport {
    pub table: String,
    pub written: usize,
    pub failures: Vec<RowFailure>,
}

impl UpsertReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Upsert every row of `table` into `spec.table`.
///
/// All rows share one transaction. Each row runs inside its own savepoint, so
/// a row that violates a constraint is rolled back alone, logged and reported
/// while the remaining rows still go in; the transaction commits at the end.
/// Any other error (read-only or locked database, I/O, bad statement) aborts
/// the whole call and nothing is committed.
pub fn upsert(
    table: &Table,
    spec: &UpsertSpec,
    conn: &mut Connection,
) -> Result<UpsertReport, SinkError> {
    let schema = table.schema();
    for column in std::iter::once(&spec.primary_key).chain(spec.mutable_columns) {
        if schema.index_of(column).is_none() {
            return Err(SinkError::MissingColumn {
                table: table.name().to_string(),
                column: column.to_string(),
            });
        }
    }
    let key_index = schema.index_of(spec.primary_key).unwrap_or_default();

    let sql = spec.statement(schema.columns());
    debug!("Upsert statement for {}: {}", spec.table, sql);

    let mut report = UpsertReport {
        table: spec.table.to_string(),
        ..Default::default()
    };

    let mut tx = conn.transaction()?;
    for (index, row) in table.rows().iter().enumerate() {
        let savepoint = tx.savepoint()?;
        let result = {
            let mut stmt = savepoint.prepare_cached(&sql)?;
            stmt.execute(params_from_iter(row.iter()))
        };

        match result {
            Ok(_) => {
                savepoint.commit()?;
                report.written += 1;
            }
            Err(e) if is_constraint_violation(&e) => {
                // dropping the savepoint rolls this row back
                let id = row[key_index].to_string();
                error!("Failed to upsert {} row {} ({}): {}", spec.table, index, id, e);
                report.failures.push(RowFailure {
                    row: index,
                    id,
                    error: e.to_string(),
                });
            }
            Err(e) => {
                error!("Upsert into {} aborted at row {}: {}", spec.table, index, e);
                return Err(SinkError::Database(e));
            }
        }
    }
    tx.commit()?;

    metrics::record_upsert(spec.table, report.written, report.failures.len());
    info!(
        "Upserted {} rows into {} ({} failed)",
        report.written,
        spec.table,
        report.failures.len()
    );
    Ok(report)
}

fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}
