//! Atlas-Scrape: country indicator harvester
//!
//! This crate scrapes per-country statistical indicators from a data portal,
//! enriches every country with the category labels (region, income level)
//! found on the portal's listing pages, persists the merged documents in a
//! SQLite document store and serves a filtered, paginated read query over them.

pub mod api;
pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod storage;

use thiserror::Error;

/// Main error type for Atlas-Scrape operations
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Query error: {0}")]
    Query(#[from] api::QueryError),

    #[error("Reference page {url} could not be fetched; indicator keys are unavailable")]
    KeyDiscovery { url: String },

    #[error("Country listing {url} could not be fetched")]
    CountryListing { url: String },

    #[error("Reference page {url} lists no indicators")]
    NoIndicatorKeys { url: String },

    #[error("Detail page for {country} has {cells} indicator cells but {keys} keys were discovered")]
    Alignment {
        country: String,
        keys: usize,
        cells: usize,
    },

    #[error("{country} is listed under several {field} values: {labels:?}")]
    AmbiguousCategory {
        country: String,
        field: String,
        labels: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Atlas-Scrape operations
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator, CrawlOutcome, CrawlReport};
pub use record::{CategoryIndex, CountryRecord, IndicatorKey, MetadataValue};
