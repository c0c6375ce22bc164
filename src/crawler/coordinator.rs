//! Crawler coordinator - main crawl orchestration logic
//!
//! One run proceeds in fixed phases:
//! - Discover the indicator keys from the reference country
//! - Crawl every country's detail page and every category dimension, the two
//!   fan-outs running side by side
//! - Merge category labels into the records once both have finished
//! - Persist the merged batch and record the run

use crate::config::Config;
use crate::crawler::categories::crawl_categories;
use crate::crawler::countries::enumerate_countries;
use crate::crawler::detail::fetch_country_detail;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::keys::{conflicting_keys, discover_keys};
use crate::crawler::merger::merge;
use crate::record::{CategoryIndex, CountryLink, CountryRecord, IndicatorKey, COUNTRY_NAME_FIELD};
use crate::storage::{RunStatus, SqliteStorage, Storage};
use crate::AtlasError;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

/// Counters describing one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub countries_listed: usize,
    pub records_extracted: usize,
    /// Detail pages that could not be fetched
    pub unreachable_pages: usize,
    /// Detail pages whose cells did not line up with the keys
    pub misaligned_pages: usize,
    /// Category values found, by dimension field
    pub category_values: BTreeMap<String, usize>,
    /// Category values whose member listing came back empty
    pub empty_category_values: usize,
    /// Records left without a label, by dimension field
    pub unmatched: BTreeMap<String, usize>,
    pub ambiguous: usize,
    pub requests_issued: usize,
    /// Most requests observed in flight at once
    pub peak_in_flight: usize,
    pub failed_fetches: usize,
    /// Set once the batch has been persisted
    pub records_stored: usize,
}

impl CrawlReport {
    pub fn log_summary(&self) {
        tracing::info!(
            "Countries listed: {}, records extracted: {}, unreachable: {}, misaligned: {}",
            self.countries_listed,
            self.records_extracted,
            self.unreachable_pages,
            self.misaligned_pages
        );
        for (field, count) in &self.category_values {
            tracing::info!(
                "Dimension {}: {} values, {} records unmatched",
                field,
                count,
                self.unmatched.get(field).copied().unwrap_or(0)
            );
        }
        if self.empty_category_values > 0 {
            tracing::warn!(
                "{} category values had no members",
                self.empty_category_values
            );
        }
        if self.ambiguous > 0 {
            tracing::warn!("{} ambiguous category matches", self.ambiguous);
        }
        tracing::info!(
            "HTTP requests: {} (peak {} in flight), failed fetches: {}",
            self.requests_issued,
            self.peak_in_flight,
            self.failed_fetches
        );
    }
}

/// Everything one run produced, before persistence
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub keys: Vec<IndicatorKey>,
    pub records: Vec<CountryRecord>,
    pub categories: CategoryIndex,
    pub report: CrawlReport,
}

/// Result of crawling the detail pages
struct IndicatorCrawl {
    listed: usize,
    records: Vec<CountryRecord>,
    unreachable: usize,
    misaligned: usize,
}

/// Main crawler coordinator structure
///
/// Owns the configuration only; each call to [`Coordinator::run`] builds its
/// own fetcher, so runs never share state.
pub struct Coordinator {
    config: Config,
}

impl Coordinator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one crawl and returns the merged records
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - Keys, merged records, category index and counters
    /// * `Err(AtlasError)` - Key discovery failed, the country listing was
    ///   unavailable, or a category match was ambiguous under the `reject`
    ///   policy
    pub async fn run(&self) -> Result<CrawlOutcome, AtlasError> {
        let scraper = &self.config.scraper;
        let fetcher = Fetcher::new(scraper, &self.config.user_agent)?;
        let dimensions = self.config.category_dimensions();

        let keys = discover_keys(&fetcher, &scraper.reference_country).await?;

        let mut reserved = vec![COUNTRY_NAME_FIELD.to_string()];
        reserved.extend(dimensions.iter().map(|entry| entry.field_name()));
        for key in conflicting_keys(&keys, &reserved) {
            tracing::warn!(
                "Indicator key '{}' collides with another document field; later values overwrite earlier ones",
                key
            );
        }

        let (indicators, categories) = tokio::join!(
            crawl_indicators(&fetcher, &scraper.country_listing, &keys),
            crawl_categories(&fetcher, &scraper.country_listing, &dimensions),
        );
        let indicators = indicators?;

        let mut records = indicators.records;
        let merged = merge(&mut records, &categories, self.config.merge.ambiguity)?;

        let report = CrawlReport {
            countries_listed: indicators.listed,
            records_extracted: records.len(),
            unreachable_pages: indicators.unreachable,
            misaligned_pages: indicators.misaligned,
            category_values: categories
                .dimensions()
                .iter()
                .map(|d| (d.field.clone(), d.values.len()))
                .collect(),
            empty_category_values: categories
                .dimensions()
                .iter()
                .flat_map(|d| d.values.iter())
                .filter(|v| v.members.is_empty())
                .count(),
            unmatched: merged.unmatched,
            ambiguous: merged.ambiguous,
            requests_issued: fetcher.requests_issued(),
            peak_in_flight: fetcher.peak_in_flight(),
            failed_fetches: fetcher.failed_fetches(),
            records_stored: 0,
        };

        Ok(CrawlOutcome {
            keys,
            records,
            categories,
            report,
        })
    }
}

/// Enumerates the countries and extracts every detail page concurrently
///
/// Records come back in listing order. Unreachable and misaligned pages are
/// logged and counted, never fatal; only an unavailable listing is.
async fn crawl_indicators(
    fetcher: &Fetcher,
    listing_path: &str,
    keys: &[IndicatorKey],
) -> Result<IndicatorCrawl, AtlasError> {
    let countries = enumerate_countries(fetcher, listing_path).await?;

    let results = join_all(
        countries
            .iter()
            .map(|country| fetch_country_detail(fetcher, country, keys)),
    )
    .await;

    let mut crawl = IndicatorCrawl {
        listed: countries.len(),
        records: Vec::with_capacity(countries.len()),
        unreachable: 0,
        misaligned: 0,
    };

    for (country, result) in countries.iter().zip(results) {
        match result {
            Ok(Some(record)) => crawl.records.push(record),
            Ok(None) => {
                tracing::warn!("No record for {}: detail page unavailable", country.name);
                crawl.unreachable += 1;
            }
            Err(e) => {
                log_rejected(country, &e);
                crawl.misaligned += 1;
            }
        }
    }

    Ok(crawl)
}

fn log_rejected(country: &CountryLink, error: &AtlasError) {
    tracing::error!("Rejected {} ({}): {}", country.name, country.path, error);
}

/// Runs a crawl and persists its records
///
/// The run is recorded in the database before crawling starts. A crawl
/// failure marks it failed and leaves the stored documents untouched;
/// otherwise the batch is inserted in one transaction and the run is
/// completed with the stored count. With `fresh`, the batch replaces the
/// previously stored documents in that same transaction.
pub async fn run_crawl(
    config: Config,
    config_hash: &str,
    fresh: bool,
) -> Result<CrawlReport, AtlasError> {
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let run_id = storage.create_run(config_hash)?;
    tracing::info!("Starting crawl run {}", run_id);

    let start_time = Instant::now();
    let coordinator = Coordinator::new(config);

    let outcome = match coordinator.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            storage.update_run_status(run_id, RunStatus::Failed)?;
            return Err(e);
        }
    };

    let stored = persist(&mut storage, run_id, &outcome.records, fresh);
    let stored = match stored {
        Ok(stored) => stored,
        Err(e) => {
            storage.update_run_status(run_id, RunStatus::Failed)?;
            return Err(e);
        }
    };

    storage.complete_run(run_id, stored as u64)?;

    let mut report = outcome.report;
    report.records_stored = stored;
    report.log_summary();

    tracing::info!(
        "Crawl run {} completed: {} records stored in {:?}",
        run_id,
        stored,
        start_time.elapsed()
    );

    Ok(report)
}

fn persist(
    storage: &mut dyn Storage,
    run_id: i64,
    records: &[CountryRecord],
    fresh: bool,
) -> Result<usize, AtlasError> {
    if !fresh {
        return Ok(storage.insert_records(run_id, records)?);
    }

    if records.is_empty() {
        tracing::warn!("Crawl produced no records; keeping previously stored countries");
        return Ok(0);
    }

    let removed = storage.replace_records(run_id, records)?;
    tracing::info!(
        "Replaced {} previously stored records with {}",
        removed,
        records.len()
    );
    Ok(records.len())
}
