//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Country documents live in a TEXT column and are filtered with SQLite's
//! JSON functions.

use crate::record::CountryRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordFilter, Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::AtlasError;
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use serde_json::Value;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(AtlasError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, AtlasError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, AtlasError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn insert_batch(tx: &Transaction<'_>, run_id: i64, records: &[CountryRecord]) -> StorageResult<()> {
    let mut stmt =
        tx.prepare("INSERT INTO countries (run_id, country_name, document) VALUES (?1, ?2, ?3)")?;
    for record in records {
        let document = serde_json::to_string(&record.to_document())?;
        stmt.execute(params![run_id, record.country_name, document])?;
    }
    Ok(())
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        records_stored: row.get::<_, i64>(5)? as u64,
    })
}

/// JSON path selecting a top-level document field
///
/// Field names are quoted into the path, so a name containing a double
/// quote cannot be expressed and is refused.
fn field_path(field: &str) -> StorageResult<String> {
    if field.is_empty() || field.contains('"') {
        return Err(StorageError::InvalidField(field.to_string()));
    }
    Ok(format!("$.\"{}\"", field))
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, records_stored
                 FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?;

        run.ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, records_stored
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let finished_at = match status {
            RunStatus::Running => None,
            RunStatus::Completed | RunStatus::Failed => Some(now),
        };

        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), finished_at, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64, records_stored: u64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, records_stored = ?3 WHERE id = ?4",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                records_stored as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Country Documents =====

    fn insert_records(&mut self, run_id: i64, records: &[CountryRecord]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        insert_batch(&tx, run_id, records)?;
        tx.commit()?;

        Ok(records.len())
    }

    fn replace_records(&mut self, run_id: i64, records: &[CountryRecord]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM countries", [])?;
        insert_batch(&tx, run_id, records)?;
        tx.commit()?;

        Ok(removed)
    }

    fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM countries", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn query_records(
        &self,
        filters: &[RecordFilter],
        skip: u64,
        limit: u64,
    ) -> StorageResult<Vec<Value>> {
        let mut conditions = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        for filter in filters {
            if filter.field == "country_name" {
                conditions.push(format!("country_name = ?{}", values.len() + 1));
            } else {
                values.push(SqlValue::Text(field_path(&filter.field)?));
                conditions.push(format!(
                    "json_extract(document, ?{}) = ?{}",
                    values.len(),
                    values.len() + 1
                ));
            }
            values.push(SqlValue::Text(filter.value.clone()));
        }

        let mut sql = String::from("SELECT document FROM countries");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(&format!(
            " ORDER BY id LIMIT ?{} OFFSET ?{}",
            values.len() + 1,
            values.len() + 2
        ));
        values.push(SqlValue::Integer(limit as i64));
        values.push(SqlValue::Integer(skip as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| row.get::<_, String>(0))?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(serde_json::from_str(&row?)?);
        }

        Ok(documents)
    }

    fn count_by_field(&self, field: &str) -> StorageResult<Vec<(Option<String>, u64)>> {
        let path = field_path(field)?;
        let mut stmt = self.conn.prepare(
            "SELECT json_extract(document, ?1) AS label, COUNT(*) AS n
             FROM countries
             GROUP BY label
             ORDER BY n DESC, label",
        )?;

        let rows = stmt.query_map(params![path], |row| {
            Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }

        Ok(counts)
    }
}
