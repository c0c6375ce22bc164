//! Indicator key discovery
//!
//! The reference country's detail page defines the ordered key list that
//! every other detail page is aligned against.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{element_text, first_within, markers, select_all};
use crate::record::IndicatorKey;
use crate::AtlasError;
use scraper::Html;
use std::collections::BTreeSet;

/// Extracts the ordered indicator keys from a detail page
///
/// The label of a headline is the text of its anchor when it has one,
/// otherwise the headline's own text.
pub fn extract_indicator_keys(document: &Html) -> Vec<IndicatorKey> {
    select_all(document, markers::INDICATOR_HEADLINE)
        .into_iter()
        .map(|headline| {
            let label = match first_within(headline, "a") {
                Some(anchor) => element_text(anchor),
                None => element_text(headline),
            };
            IndicatorKey::from_label(&label)
        })
        .collect()
}

/// Fetches the reference page and discovers the indicator keys
///
/// Fails when the page cannot be fetched or lists no indicators: without
/// keys no detail page can be aligned.
pub async fn discover_keys(
    fetcher: &Fetcher,
    reference_path: &str,
) -> Result<Vec<IndicatorKey>, AtlasError> {
    tracing::info!("Discovering indicator keys from {}", reference_path);

    let url = fetcher
        .resolve(reference_path)
        .map(|u| u.to_string())
        .unwrap_or_else(|| reference_path.to_string());

    let document = fetcher
        .fetch_document(reference_path)
        .await
        .ok_or_else(|| AtlasError::KeyDiscovery { url: url.clone() })?;

    let keys = extract_indicator_keys(&document);
    if keys.is_empty() {
        return Err(AtlasError::NoIndicatorKeys { url });
    }

    tracing::info!("Discovered {} indicator keys", keys.len());
    tracing::debug!(
        "Indicator keys: {}",
        keys.iter()
            .map(IndicatorKey::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(keys)
}

/// Returns the keys that would overwrite another field of the document
///
/// A key collides when two headlines normalize to the same name, or when it
/// equals one of the `reserved` fields (`country_name`, category fields).
/// Each colliding name is reported once, in page order.
pub fn conflicting_keys(keys: &[IndicatorKey], reserved: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut conflicts: Vec<String> = Vec::new();

    for key in keys {
        let name = key.as_str();
        let collides = !seen.insert(name) || reserved.iter().any(|field| field == name);
        if collides && !conflicts.iter().any(|c| c == name) {
            conflicts.push(name.to_string());
        }
    }

    conflicts
}
