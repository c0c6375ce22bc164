//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a miniature data portal and run the
//! full crawl cycle end-to-end: key discovery, detail pages, category
//! listings, merge and persistence.

use atlas_scrape::api::{list_countries, CountryQuery, QueryResponse};
use atlas_scrape::config::{
    AmbiguityPolicy, Config, MergeConfig, OutputConfig, ScraperConfig, UserAgentConfig,
};
use atlas_scrape::crawler::{run_crawl, Coordinator};
use atlas_scrape::storage::{RunStatus, SqliteStorage, Storage};
use atlas_scrape::AtlasError;
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, db_path: &str) -> Config {
    Config {
        scraper: ScraperConfig {
            base_url: base_url.to_string(),
            country_listing: "/country".to_string(),
            reference_country: "/country/afghanistan".to_string(),
            max_concurrent_requests: 4,
            request_timeout: 5,
            retry_attempts: 0,
            retry_delay: 10,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
        merge: MergeConfig::default(),
        categories: vec![],
    }
}

fn headline(label: &str) -> String {
    format!(
        r#"<div class="indicator-item__headline-mobile"><a href="/indicator/x">{}</a></div>"#,
        label
    )
}

fn value_cell(value: &str, year: &str) -> String {
    format!(
        r#"<div class="indicator-item__col indicator-item__col--middle">
             <div class="indicator-item__data-inner-col-wrapper">
               <div class="indicator-item__data-info"><span>{}</span></div>
               <p class="indicator-item__data-info-year">{}</p>
             </div>
           </div>"#,
        value, year
    )
}

fn empty_cell() -> String {
    r#"<div class="indicator-item__col indicator-item__col--middle">
         <p class="indicator-item__data-info-empty">No data</p>
       </div>"#
        .to_string()
}

fn html(parts: &[String]) -> String {
    format!("<html><body>{}</body></html>", parts.concat())
}

/// Listing page: the given countries plus the Region and Income levels lists
fn listing_page(countries: &[(&str, &str)], regions: &[(&str, &str)]) -> String {
    let items: String = countries
        .iter()
        .map(|(name, href)| format!(r#"<li><a href="{}">{}</a></li>"#, href, name))
        .collect();
    let category = |values: &[(&str, &str)]| -> String {
        values
            .iter()
            .map(|(name, href)| {
                format!(
                    r#"<li class="overview-list-item"><a href="{}">{}</a></li>"#,
                    href, name
                )
            })
            .collect()
    };

    format!(
        r#"<html><body>
        <section class="nav-item"><ul>{}</ul></section>
        <ul class="overview">
          <li><h3>Region</h3><ol>{}</ol></li>
          <li><h3>Income levels</h3><ol>{}</ol></li>
        </ul>
        </body></html>"#,
        items,
        category(regions),
        category(&[("Low income", "/income-level/low-income")]),
    )
}

fn members_page(members: &[&str]) -> String {
    let labels: String = members
        .iter()
        .map(|m| format!(r#"<li class="label">{}</li>"#, m))
        .collect();
    format!(
        r#"<html><body><article class="details card"><ul>{}</ul></article></body></html>"#,
        labels
    )
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn serve_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Mounts the reference page defining keys `population` and `gdp`
async fn mount_reference(server: &MockServer) {
    serve(
        server,
        "/country/afghanistan",
        html(&[
            headline("Population, total"),
            headline("GDP (current US$)"),
            value_cell("38.9 million", "(2021)"),
            value_cell("$14.8 billion", "(2021)"),
        ]),
    )
    .await;
}

/// Mounts a portal with country X, an Asia region listing X, an empty
/// Europe region and a Low income level listing X
async fn mount_portal(server: &MockServer, countries: &[(&str, &str)]) {
    mount_reference(server).await;
    serve(
        server,
        "/country",
        listing_page(
            countries,
            &[("Asia", "/region/asia"), ("Europe", "/region/europe")],
        ),
    )
    .await;
    serve(
        server,
        "/country/x",
        html(&[empty_cell(), value_cell("100", "(2020)")]),
    )
    .await;
    serve(server, "/region/asia", members_page(&["X"])).await;
    serve(server, "/region/europe", members_page(&[])).await;
    serve(server, "/income-level/low-income", members_page(&["X"])).await;
}

#[tokio::test]
async fn test_full_crawl_merges_categories() {
    let mock_server = MockServer::start().await;
    mount_portal(&mock_server, &[("X", "/country/x")]).await;

    let config = create_test_config(&mock_server.uri(), "unused.db");
    let outcome = Coordinator::new(config).run().await.expect("Crawl failed");

    let keys: Vec<&str> = outcome.keys.iter().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["population", "gdp"]);

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(
        outcome.records[0].to_document(),
        json!({
            "country_name": "X",
            "population": null,
            "gdp": { "value": "100", "year": "2020" },
            "income_levels": "Low income",
            "region": "Asia",
        })
    );

    let region = outcome.categories.dimension("region").expect("region crawled");
    assert_eq!(region.values.len(), 2);
    assert!(region.members("Europe").expect("Europe present").is_empty());

    let report = &outcome.report;
    assert_eq!(report.countries_listed, 1);
    assert_eq!(report.records_extracted, 1);
    assert_eq!(report.category_values.get("region"), Some(&2));
    assert_eq!(report.category_values.get("income_levels"), Some(&1));
    assert_eq!(report.empty_category_values, 1);
    assert_eq!(report.unmatched.get("region"), Some(&0));
    assert_eq!(report.failed_fetches, 0);
}

#[tokio::test]
async fn test_unreachable_detail_page_yields_no_record() {
    let mock_server = MockServer::start().await;
    mount_portal(&mock_server, &[("X", "/country/x"), ("Y", "/country/y")]).await;

    // 404 is never retried
    Mock::given(method("GET"))
        .and(path("/country/y"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), "unused.db");
    config.scraper.retry_attempts = 3;
    let outcome = Coordinator::new(config).run().await.expect("Crawl failed");

    let names: Vec<&str> = outcome
        .records
        .iter()
        .map(|r| r.country_name.as_str())
        .collect();
    assert_eq!(names, vec!["X"]);
    assert_eq!(outcome.report.countries_listed, 2);
    assert_eq!(outcome.report.unreachable_pages, 1);
}

#[tokio::test]
async fn test_failed_category_value_keeps_empty_entry() {
    let mock_server = MockServer::start().await;
    mount_reference(&mock_server).await;
    serve(
        &mock_server,
        "/country",
        listing_page(
            &[("X", "/country/x")],
            &[("Asia", "/region/asia"), ("Oceania", "/region/oceania")],
        ),
    )
    .await;
    serve(
        &mock_server,
        "/country/x",
        html(&[empty_cell(), value_cell("100", "(2020)")]),
    )
    .await;
    serve(&mock_server, "/region/asia", members_page(&["X"])).await;
    serve_status(&mock_server, "/region/oceania", 500).await;
    serve(&mock_server, "/income-level/low-income", members_page(&["X"])).await;

    let config = create_test_config(&mock_server.uri(), "unused.db");
    let outcome = Coordinator::new(config).run().await.expect("Crawl failed");

    let region = outcome.categories.dimension("region").expect("region crawled");
    let labels: Vec<&str> = region.values.iter().map(|v| v.label.as_str()).collect();
    assert_eq!(labels, vec!["Asia", "Oceania"]);
    assert!(region.members("Oceania").expect("Oceania present").is_empty());

    assert_eq!(outcome.records[0].category("region"), Some("Asia"));
    assert_eq!(outcome.report.failed_fetches, 1);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mock_server = MockServer::start().await;
    mount_portal(&mock_server, &[("X", "/country/x")]).await;

    Mock::given(method("GET"))
        .and(path("/country/x"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), "unused.db");
    config.scraper.retry_attempts = 2;
    let outcome = Coordinator::new(config).run().await.expect("Crawl failed");

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.report.unreachable_pages, 0);
    assert_eq!(outcome.report.failed_fetches, 0);
}

#[tokio::test]
async fn test_misaligned_detail_page_is_rejected() {
    let mock_server = MockServer::start().await;
    mount_portal(&mock_server, &[("X", "/country/x"), ("Z", "/country/z")]).await;
    serve(
        &mock_server,
        "/country/z",
        html(&[value_cell("1", "(2019)")]),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), "unused.db");
    let outcome = Coordinator::new(config).run().await.expect("Crawl failed");

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].country_name, "X");
    assert_eq!(outcome.report.misaligned_pages, 1);
}

#[tokio::test]
async fn test_requests_stay_within_concurrency_limit() {
    let mock_server = MockServer::start().await;
    mount_reference(&mock_server).await;

    let countries: Vec<(String, String)> = (0..6)
        .map(|i| (format!("C{}", i), format!("/country/c{}", i)))
        .collect();
    let listed: Vec<(&str, &str)> = countries
        .iter()
        .map(|(name, href)| (name.as_str(), href.as_str()))
        .collect();
    serve(
        &mock_server,
        "/country",
        listing_page(
            &listed,
            &[
                ("Asia", "/region/asia"),
                ("Europe", "/region/europe"),
                ("Africa", "/region/africa"),
            ],
        ),
    )
    .await;

    let delay = Duration::from_millis(200);
    for (_, href) in &countries {
        Mock::given(method("GET"))
            .and(path(href.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(html(&[empty_cell(), value_cell("1", "(2020)")]))
                    .set_delay(delay),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    // Every category value is fetched exactly once
    for (route, members) in [
        ("/region/asia", vec!["C0", "C1"]),
        ("/region/europe", vec!["C2", "C3"]),
        ("/region/africa", vec!["C4"]),
        ("/income-level/low-income", vec!["C0", "C5"]),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(members_page(&members)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let mut config = create_test_config(&mock_server.uri(), "unused.db");
    config.scraper.max_concurrent_requests = 2;

    let start = Instant::now();
    let outcome = Coordinator::new(config).run().await.expect("Crawl failed");
    let elapsed = start.elapsed();

    let report = &outcome.report;
    assert_eq!(report.records_extracted, 6);
    assert_eq!(report.peak_in_flight, 2);
    // Six delayed pages through two permits take at least three delays
    assert!(elapsed >= delay * 3, "crawl finished in {:?}", elapsed);

    // Reference, listing once per consumer, six details, four category values
    assert_eq!(report.requests_issued, 1 + 3 + 6 + 4);
    assert_eq!(report.category_values.get("region"), Some(&3));
    assert_eq!(report.unmatched.get("region"), Some(&1));
    assert_eq!(outcome.records[5].category("income_levels"), Some("Low income"));

    mock_server.verify().await;
}

#[tokio::test]
async fn test_unavailable_listing_keeps_stored_countries() {
    let mock_server = MockServer::start().await;
    mount_portal(&mock_server, &[("X", "/country/x")]).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("countries.db");
    let config = create_test_config(&mock_server.uri(), db_path.to_str().expect("utf-8 path"));

    let report = run_crawl(config.clone(), "hash", false)
        .await
        .expect("Crawl failed");
    assert_eq!(report.records_stored, 1);

    Mock::given(method("GET"))
        .and(path("/country"))
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .mount(&mock_server)
        .await;

    let result = run_crawl(config, "hash", true).await;
    assert!(
        matches!(result, Err(AtlasError::CountryListing { .. })),
        "expected listing error, got {:?}",
        result
    );

    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    assert_eq!(storage.count_records().expect("count"), 1);
    let run = storage.get_latest_run().expect("run query").expect("run recorded");
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.records_stored, 0);
}

#[tokio::test]
async fn test_reference_failure_is_fatal() {
    let mock_server = MockServer::start().await;
    serve_status(&mock_server, "/country/afghanistan", 500).await;

    let config = create_test_config(&mock_server.uri(), "unused.db");
    let result = Coordinator::new(config).run().await;

    assert!(matches!(result, Err(AtlasError::KeyDiscovery { .. })));
}

#[tokio::test]
async fn test_reference_without_indicators_is_fatal() {
    let mock_server = MockServer::start().await;
    serve(
        &mock_server,
        "/country/afghanistan",
        "<html><body><h1>Afghanistan</h1></body></html>".to_string(),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), "unused.db");
    let result = Coordinator::new(config).run().await;

    assert!(matches!(result, Err(AtlasError::NoIndicatorKeys { .. })));
}

#[tokio::test]
async fn test_ambiguity_reject_fails_before_persistence() {
    let mock_server = MockServer::start().await;
    mount_reference(&mock_server).await;
    serve(
        &mock_server,
        "/country",
        listing_page(
            &[("X", "/country/x")],
            &[("Asia", "/region/asia"), ("Arab World", "/region/arab-world")],
        ),
    )
    .await;
    serve(
        &mock_server,
        "/country/x",
        html(&[empty_cell(), value_cell("100", "(2020)")]),
    )
    .await;
    serve(&mock_server, "/region/asia", members_page(&["X"])).await;
    serve(&mock_server, "/region/arab-world", members_page(&["X"])).await;
    serve(&mock_server, "/income-level/low-income", members_page(&["X"])).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("countries.db");
    let mut config = create_test_config(&mock_server.uri(), db_path.to_str().expect("utf-8 path"));
    config.merge.ambiguity = AmbiguityPolicy::Reject;

    let result = run_crawl(config, "hash", false).await;
    match result {
        Err(AtlasError::AmbiguousCategory { country, labels, .. }) => {
            assert_eq!(country, "X");
            assert_eq!(labels, vec!["Asia", "Arab World"]);
        }
        other => panic!("expected ambiguity error, got {:?}", other),
    }

    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    assert_eq!(storage.count_records().expect("count"), 0);
    let run = storage.get_latest_run().expect("run query").expect("run recorded");
    assert_eq!(run.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_crawl_persists_and_serves_query() {
    let mock_server = MockServer::start().await;
    mount_portal(&mock_server, &[("X", "/country/x"), ("W", "/country/w")]).await;
    serve(
        &mock_server,
        "/country/w",
        html(&[value_cell("5", "(2018)"), empty_cell()]),
    )
    .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("countries.db");
    let config = create_test_config(&mock_server.uri(), db_path.to_str().expect("utf-8 path"));

    let report = run_crawl(config.clone(), "hash-1", false)
        .await
        .expect("Crawl failed");
    assert_eq!(report.records_stored, 2);

    // A second plain run appends; a fresh run replaces
    run_crawl(config.clone(), "hash-1", false)
        .await
        .expect("Crawl failed");
    let report = run_crawl(config, "hash-2", true).await.expect("Crawl failed");
    assert_eq!(report.records_stored, 2);

    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    assert_eq!(storage.count_records().expect("count"), 2);
    assert_eq!(storage.count_runs().expect("count"), 3);

    let run = storage.get_latest_run().expect("run query").expect("run recorded");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash-2");
    assert_eq!(run.records_stored, 2);

    let query = CountryQuery {
        region: Some("Asia".to_string()),
        ..Default::default()
    };
    let response = list_countries(&storage, &query).expect("valid query");
    assert_eq!(
        response,
        QueryResponse::Records(vec![json!({
            "country_name": "X",
            "population": null,
            "gdp": { "value": "100", "year": "2020" },
            "income_levels": "Low income",
            "region": "Asia",
        })])
    );

    let query = CountryQuery {
        country_name: Some("W".to_string()),
        ..Default::default()
    };
    let response = list_countries(&storage, &query).expect("valid query");
    match response {
        QueryResponse::Records(docs) => {
            assert_eq!(docs.len(), 1);
            assert!(docs[0].get("region").is_none());
            assert_eq!(docs[0]["population"]["year"], "2018");
        }
        QueryResponse::Error { error } => panic!("query failed: {}", error),
    }
}
