//! Statistics generation from the document store
//!
//! This module provides functionality for extracting and displaying
//! statistics about stored country documents and crawl runs.

use crate::storage::{RunRecord, Storage};
use crate::AtlasError;
use std::collections::BTreeMap;

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of stored country documents
    pub total_records: u64,

    /// Number of crawl runs recorded
    pub total_runs: u64,

    pub latest_run: Option<RunRecord>,

    /// Per dimension field, the document count of each label
    /// (`None` counts documents without the field)
    pub dimension_counts: BTreeMap<String, Vec<(Option<String>, u64)>>,
}

impl StoreStatistics {
    /// Documents carrying a label for `field`
    pub fn labelled(&self, field: &str) -> u64 {
        self.dimension_counts
            .get(field)
            .map(|counts| {
                counts
                    .iter()
                    .filter(|(label, _)| label.is_some())
                    .map(|(_, n)| n)
                    .sum()
            })
            .unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `fields` - Category dimension fields to break down
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(AtlasError)` - Failed to query statistics
pub fn load_statistics(
    storage: &dyn Storage,
    fields: &[String],
) -> Result<StoreStatistics, AtlasError> {
    let total_records = storage.count_records()?;
    let total_runs = storage.count_runs()?;
    let latest_run = storage.get_latest_run()?;

    let mut dimension_counts = BTreeMap::new();
    for field in fields {
        dimension_counts.insert(field.clone(), storage.count_by_field(field)?);
    }

    Ok(StoreStatistics {
        total_records,
        total_runs,
        latest_run,
        dimension_counts,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Stored countries: {}", stats.total_records);
    println!("  Crawl runs: {}", stats.total_runs);
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  ID: {}", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Records stored: {}", run.records_stored);
        println!("  Config hash: {}", run.config_hash);
        println!();
    }

    for (field, counts) in &stats.dimension_counts {
        let labelled = stats.labelled(field);
        let coverage = if stats.total_records > 0 {
            (labelled as f64 / stats.total_records as f64) * 100.0
        } else {
            0.0
        };
        println!("{} ({:.1}% labelled):", field, coverage);

        for (label, count) in counts {
            println!("  {}: {}", label.as_deref().unwrap_or("(none)"), count);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CountryRecord;
    use crate::storage::SqliteStorage;

    fn storage_with(records: &[CountryRecord]) -> (tempfile::TempDir, SqliteStorage) {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = SqliteStorage::new(&dir.path().join("stats.db")).unwrap();
        let run_id = storage.create_run("hash").unwrap();
        storage.insert_records(run_id, records).unwrap();
        storage.complete_run(run_id, records.len() as u64).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_load_statistics() {
        let mut nepal = CountryRecord::new("Nepal");
        nepal.set_category("region", "South Asia");
        let mut india = CountryRecord::new("India");
        india.set_category("region", "South Asia");
        let kosovo = CountryRecord::new("Kosovo");

        let (_dir, storage) = storage_with(&[nepal, india, kosovo]);
        let stats = load_statistics(&storage, &["region".to_string()]).unwrap();

        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.total_runs, 1);
        assert_eq!(stats.latest_run.as_ref().map(|r| r.records_stored), Some(3));
        assert_eq!(stats.labelled("region"), 2);
        assert_eq!(stats.labelled("income_levels"), 0);
    }

    #[test]
    fn test_empty_store() {
        let (_dir, storage) = storage_with(&[]);
        let stats = load_statistics(&storage, &[]).unwrap();

        assert_eq!(stats.total_records, 0);
        assert!(stats.dimension_counts.is_empty());
        print_statistics(&stats);
    }
}
