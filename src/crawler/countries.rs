//! Country enumeration from the listing page

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{element_text, first_within, markers, select_all, select_within};
use crate::record::CountryLink;
use crate::AtlasError;
use scraper::Html;

/// Extracts every (name, detail path) pair from the listing page's navigation
///
/// Entries are returned in page order. Duplicates are kept; items without a
/// link are skipped.
pub fn extract_country_links(document: &Html) -> Vec<CountryLink> {
    let mut countries = Vec::new();

    for section in select_all(document, markers::NAV_SECTION) {
        for item in select_within(section, "li") {
            let name = element_text(item);
            let href = first_within(item, "a[href]").and_then(|a| a.value().attr("href"));

            match href {
                Some(path) => countries.push(CountryLink {
                    name,
                    path: path.trim().to_string(),
                }),
                None => tracing::debug!("Skipping listing entry without a link: '{}'", name),
            }
        }
    }

    countries
}

/// Fetches the listing page and enumerates the countries to crawl
///
/// Fails when the listing page cannot be fetched.
pub async fn enumerate_countries(
    fetcher: &Fetcher,
    listing_path: &str,
) -> Result<Vec<CountryLink>, AtlasError> {
    let Some(document) = fetcher.fetch_document(listing_path).await else {
        let url = fetcher
            .resolve(listing_path)
            .map(|u| u.to_string())
            .unwrap_or_else(|| listing_path.to_string());
        return Err(AtlasError::CountryListing { url });
    };

    let countries = extract_country_links(&document);
    tracing::info!("Found {} countries on {}", countries.len(), listing_path);
    Ok(countries)
}
