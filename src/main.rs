//! Atlas-Scrape main entry point
//!
//! This is the command-line interface for the Atlas-Scrape country indicator harvester.

use anyhow::Context;
use atlas_scrape::api::{list_countries, CountryQuery};
use atlas_scrape::config::{load_config_with_hash, Config};
use atlas_scrape::crawler::crawl;
use atlas_scrape::output::{load_statistics, print_statistics};
use atlas_scrape::storage::SqliteStorage;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Atlas-Scrape: a country indicator harvester
///
/// Atlas-Scrape collects per-country indicators from a data portal, tags
/// every country with its region and income level, and stores the merged
/// documents in SQLite for querying.
#[derive(Parser, Debug)]
#[command(name = "atlas-scrape")]
#[command(version = "1.0.0")]
#[command(about = "A country indicator harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Clear previously stored countries before storing this crawl
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "query"])]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "query"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "query"])]
    stats: bool,

    /// Query stored countries and print the JSON response
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    query: bool,

    /// Exact country name to match (with --query)
    #[arg(long, requires = "query")]
    country_name: Option<String>,

    /// Exact income level to match (with --query)
    #[arg(long, requires = "query")]
    income_levels: Option<String>,

    /// Exact region to match (with --query)
    #[arg(long, requires = "query")]
    region: Option<String>,

    /// Number of matching countries to skip (with --query)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true, requires = "query")]
    skip: i64,

    /// Maximum number of countries to return, 1 to 100 (with --query)
    #[arg(
        long,
        default_value_t = atlas_scrape::api::DEFAULT_LIMIT,
        allow_negative_numbers = true,
        requires = "query"
    )]
    limit: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.query {
        let query = CountryQuery {
            country_name: cli.country_name,
            income_levels: cli.income_levels,
            region: cli.region,
            skip: cli.skip,
            limit: cli.limit,
        };
        handle_query(&config, &query)?;
    } else {
        handle_crawl(config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("atlas_scrape=info,warn"),
            1 => EnvFilter::new("atlas_scrape=debug,info"),
            2 => EnvFilter::new("atlas_scrape=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    SqliteStorage::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Atlas-Scrape Dry Run ===\n");

    let scraper = &config.scraper;
    println!("Scraper Configuration:");
    println!("  Base URL: {}", scraper.base_url);
    println!("  Country listing: {}", scraper.country_listing);
    println!("  Reference country: {}", scraper.reference_country);
    println!("  Max concurrent requests: {}", scraper.max_concurrent_requests);
    println!("  Request timeout: {}s", scraper.request_timeout);
    println!(
        "  Retries: {} (every {}ms)",
        scraper.retry_attempts, scraper.retry_delay
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let dimensions = config.category_dimensions();
    println!("\nCategory Dimensions ({}):", dimensions.len());
    for entry in &dimensions {
        println!("  - '{}' -> {}", entry.label, entry.field_name());
    }
    println!("  Ambiguous matches: {:?}", config.merge.ambiguity);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would discover keys from {} and crawl every country listed on {}",
        scraper.reference_country, scraper.country_listing
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_database(config)?;
    let fields: Vec<String> = config
        .category_dimensions()
        .iter()
        .map(|entry| entry.field_name())
        .collect();

    let stats = load_statistics(&storage, &fields)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --query mode: prints the read API's JSON response
fn handle_query(config: &Config, query: &CountryQuery) -> anyhow::Result<()> {
    let storage = open_database(config)?;
    let response = list_countries(&storage, query)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (clearing stored countries)");
    } else {
        tracing::info!("Starting crawl (appending to stored countries)");
    }

    tracing::info!(
        "Source: {}, dimensions: {}",
        config.scraper.base_url,
        config.category_dimensions().len()
    );

    match crawl(config, config_hash, fresh).await {
        Ok(report) => {
            tracing::info!(
                "Crawl completed successfully: {} countries stored",
                report.records_stored
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
