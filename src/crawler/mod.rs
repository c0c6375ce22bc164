//! Crawler module for scraping and enriching country records
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and a bounded request gate
//! - Indicator key discovery and per-country detail extraction
//! - Category membership crawling
//! - Merging categories into records and overall crawl coordination

mod categories;
mod coordinator;
mod countries;
mod detail;
mod fetcher;
mod keys;
mod merger;
mod parser;

pub use categories::{
    crawl_categories, crawl_category_value, crawl_dimension, extract_category_links,
    extract_category_members,
};
pub use coordinator::{run_crawl, Coordinator, CrawlOutcome, CrawlReport};
pub use countries::{enumerate_countries, extract_country_links};
pub use detail::{extract_country_detail, fetch_country_detail};
pub use fetcher::{build_http_client, fetch_url, FetchResult, Fetcher};
pub use keys::{conflicting_keys, discover_keys, extract_indicator_keys};
pub use merger::{merge, MergeReport};
pub use parser::markers;

use crate::config::Config;
use crate::AtlasError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Record a new run in the database
/// 2. Discover the indicator keys
/// 3. Crawl detail pages and category listings concurrently
/// 4. Merge category labels into the records
/// 5. Persist the batch and complete the run
///
/// # Arguments
///
/// * `config` - The scraper configuration
/// * `config_hash` - Hash of the configuration file, recorded on the run
/// * `fresh` - Replace previously stored records with this crawl's batch
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed and records were stored
/// * `Err(AtlasError)` - Crawl failed
pub async fn crawl(config: Config, config_hash: &str, fresh: bool) -> Result<CrawlReport, AtlasError> {
    run_crawl(config, config_hash, fresh).await
}
