//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::record::CountryRecord;
use crate::storage::{RunRecord, RunStatus};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid document field: {0}")]
    InvalidField(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Exact-match condition on one top-level document field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub field: String,
    pub value: String,
}

impl RecordFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Trait for storage backend implementations
///
/// Country documents are stored as opaque JSON; no schema is enforced beyond
/// the presence of `country_name`.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp and its stored count
    fn complete_run(&mut self, run_id: i64, records_stored: u64) -> StorageResult<()>;

    fn count_runs(&self) -> StorageResult<u64>;

    // ===== Country Documents =====

    /// Stores a batch of records in one transaction
    ///
    /// Either every record is stored or none is.
    ///
    /// # Returns
    ///
    /// The number of documents inserted
    fn insert_records(&mut self, run_id: i64, records: &[CountryRecord]) -> StorageResult<usize>;

    /// Replaces every stored document with `records` in one transaction
    ///
    /// On failure the previously stored documents are left in place.
    ///
    /// # Returns
    ///
    /// The number of documents removed
    fn replace_records(&mut self, run_id: i64, records: &[CountryRecord]) -> StorageResult<usize>;

    fn count_records(&self) -> StorageResult<u64>;

    /// Returns stored documents matching every filter, in insertion order
    ///
    /// # Arguments
    ///
    /// * `filters` - Exact-match conditions, all of which must hold
    /// * `skip` - Number of matching documents to pass over
    /// * `limit` - Maximum number of documents to return
    fn query_records(
        &self,
        filters: &[RecordFilter],
        skip: u64,
        limit: u64,
    ) -> StorageResult<Vec<Value>>;

    /// Counts documents per distinct value of `field`
    ///
    /// Documents without the field are counted under `None`. Sorted by
    /// descending count.
    fn count_by_field(&self, field: &str) -> StorageResult<Vec<(Option<String>, u64)>>;
}
