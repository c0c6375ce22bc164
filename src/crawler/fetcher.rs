//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Retry logic for transient failures
//! - Bounding the number of requests in flight
//! - Error classification
//!
//! Every failure is absorbed here: callers receive `None` and the failing
//! URL is logged.

use crate::config::{ScraperConfig, UserAgentConfig};
use crate::AtlasError;
use reqwest::Client;
use scraper::Html;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Result of a single fetch attempt
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// The server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
        /// Whether another attempt may succeed (5xx)
        retryable: bool,
    },

    /// Network error (connection refused, timeout, unreadable body, etc.)
    NetworkError {
        /// Error description
        error: String,
        /// Whether another attempt may succeed (timeouts)
        retryable: bool,
    },
}

impl FetchResult {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Success { .. } => false,
            Self::HttpError { retryable, .. } | Self::NetworkError { retryable, .. } => *retryable,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use atlas_scrape::config::{ScraperConfig, UserAgentConfig};
/// use atlas_scrape::crawler::build_http_client;
///
/// # fn example(scraper: &ScraperConfig) {
/// let user_agent = UserAgentConfig {
///     crawler_name: "AtlasScrape".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(scraper, &user_agent).unwrap();
/// # }
/// ```
pub fn build_http_client(
    scraper: &ScraperConfig,
    config: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    let timeout = Duration::from_secs(scraper.request_timeout);

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs one GET request and classifies the outcome
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | Success |
/// | HTTP 5xx | HttpError, retryable |
/// | Other non-2xx (404, 429, ...) | HttpError, final |
/// | Timeout | NetworkError, retryable |
/// | Connection refused, unreadable body | NetworkError, final |
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();
            let final_url = response.url().to_string();

            if !status.is_success() {
                return FetchResult::HttpError {
                    status_code: status.as_u16(),
                    retryable: status.is_server_error(),
                };
            }

            match response.text().await {
                Ok(body) => FetchResult::Success {
                    final_url,
                    status_code: status.as_u16(),
                    body,
                },
                Err(e) => FetchResult::NetworkError {
                    error: e.to_string(),
                    retryable: e.is_timeout(),
                },
            }
        }
        Err(e) => {
            if e.is_timeout() {
                FetchResult::NetworkError {
                    error: "Request timeout".to_string(),
                    retryable: true,
                }
            } else if e.is_connect() {
                FetchResult::NetworkError {
                    error: "Connection refused".to_string(),
                    retryable: false,
                }
            } else {
                FetchResult::NetworkError {
                    error: e.to_string(),
                    retryable: false,
                }
            }
        }
    }
}

/// Shared fetch context for one crawl run
///
/// Holds the HTTP client, resolves site paths against the base URL and
/// gates every request through a semaphore sized by
/// `max-concurrent-requests`.
pub struct Fetcher {
    client: Client,
    base_url: Url,
    gate: Semaphore,
    retry_attempts: u32,
    retry_delay: Duration,
    requests: AtomicUsize,
    failures: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Fetcher {
    pub fn new(scraper: &ScraperConfig, user_agent: &UserAgentConfig) -> Result<Self, AtlasError> {
        Ok(Self {
            client: build_http_client(scraper, user_agent)?,
            base_url: Url::parse(&scraper.base_url)?,
            gate: Semaphore::new(scraper.max_concurrent_requests as usize),
            retry_attempts: scraper.retry_attempts,
            retry_delay: Duration::from_millis(scraper.retry_delay),
            requests: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }

    /// Resolves a site path (or absolute link) against the base URL
    pub fn resolve(&self, path: &str) -> Option<Url> {
        self.base_url.join(path.trim()).ok()
    }

    /// Fetches and parses a page
    ///
    /// Returns `None` on any failure; the failing URL is logged.
    pub async fn fetch_document(&self, path: &str) -> Option<Html> {
        let Some(url) = self.resolve(path) else {
            tracing::warn!("Error fetching {}: cannot resolve against {}", path, self.base_url);
            self.failures.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        match self.fetch_with_retry(url.as_str()).await {
            FetchResult::Success {
                final_url,
                status_code,
                body,
            } => {
                tracing::debug!("Fetched {} ({})", final_url, status_code);
                Some(Html::parse_document(&body))
            }
            FetchResult::HttpError { status_code, .. } => {
                tracing::warn!("Error fetching {}: HTTP {}", url, status_code);
                self.failures.fetch_add(1, Ordering::Relaxed);
                None
            }
            FetchResult::NetworkError { error, .. } => {
                tracing::warn!("Error fetching {}: {}", url, error);
                self.failures.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn fetch_with_retry(&self, url: &str) -> FetchResult {
        let mut attempt = 0;
        loop {
            let result = match self.gate.acquire().await {
                Ok(_permit) => {
                    self.requests.fetch_add(1, Ordering::Relaxed);
                    let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
                    let result = fetch_url(&self.client, url).await;
                    self.in_flight.fetch_sub(1, Ordering::SeqCst);
                    result
                }
                Err(_) => FetchResult::NetworkError {
                    error: "request gate closed".to_string(),
                    retryable: false,
                },
            };

            if !result.is_retryable() || attempt >= self.retry_attempts {
                return result;
            }

            attempt += 1;
            tracing::debug!(
                "Retrying {} ({}/{}) after {:?}",
                url,
                attempt,
                self.retry_attempts,
                self.retry_delay
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    /// Number of HTTP requests issued so far, retries included
    pub fn requests_issued(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Highest number of requests that were in flight at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Number of pages that could not be fetched
    pub fn failed_fetches(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
}
