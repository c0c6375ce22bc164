use serde::Deserialize;

/// Main configuration structure for Atlas-Scrape
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scraper: ScraperConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default, rename = "category")]
    pub categories: Vec<CategoryEntry>,
}

impl Config {
    /// Returns the configured category dimensions, falling back to
    /// `Region` and `Income levels` when none are listed
    pub fn category_dimensions(&self) -> Vec<CategoryEntry> {
        if self.categories.is_empty() {
            vec![
                CategoryEntry::new("Region"),
                CategoryEntry::new("Income levels"),
            ]
        } else {
            self.categories.clone()
        }
    }
}

/// Source site and request behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Root of the data portal, e.g. `https://data.worldbank.org`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the page that lists every country and every category
    #[serde(rename = "country-listing", default = "default_country_listing")]
    pub country_listing: String,

    /// Detail page used to discover the indicator keys
    #[serde(rename = "reference-country", default = "default_reference_country")]
    pub reference_country: String,

    /// Maximum number of requests in flight at once
    #[serde(rename = "max-concurrent-requests", default = "default_max_concurrent")]
    pub max_concurrent_requests: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Extra attempts for 5xx responses and timeouts
    #[serde(rename = "retry-attempts", default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Pause between attempts (milliseconds)
    #[serde(rename = "retry-delay", default = "default_retry_delay")]
    pub retry_delay: u64,
}

fn default_country_listing() -> String {
    "/country".to_string()
}

fn default_reference_country() -> String {
    "/country/afghanistan".to_string()
}

fn default_max_concurrent() -> u32 {
    16
}

fn default_request_timeout() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    500
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite document store
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// How the merger treats a country listed under several values of one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbiguityPolicy {
    /// The value that appears first on the listing page wins
    #[default]
    FirstListed,
    /// The value that appears last on the listing page wins
    LastListed,
    /// The run fails
    Reject,
}

/// Merge configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub ambiguity: AmbiguityPolicy,
}

/// One category dimension to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    /// Header text of the dimension on the listing page (e.g. "Region")
    pub label: String,

    /// Document field the resolved label is stored under
    #[serde(default)]
    pub field: Option<String>,
}

impl CategoryEntry {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            field: None,
        }
    }

    /// The document field name: the explicit `field`, or the label lowercased
    /// with spaces replaced by underscores
    pub fn field_name(&self) -> String {
        match &self.field {
            Some(field) => field.clone(),
            None => self.label.trim().to_lowercase().replace(' ', "_"),
        }
    }
}
