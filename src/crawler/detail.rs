//! Country detail page extraction

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{element_text, first_within, markers, select_all};
use crate::record::{CountryLink, CountryRecord, IndicatorKey, MetadataValue};
use crate::AtlasError;
use scraper::{ElementRef, Html};

/// Builds a country's record from its detail page
///
/// Value cells are paired with `keys` by position, so the page must hold
/// exactly one cell per key. Any other count is reported as an
/// [`AtlasError::Alignment`] instead of guessing which cell belongs to which
/// key.
pub fn extract_country_detail(
    document: &Html,
    country_name: &str,
    keys: &[IndicatorKey],
) -> Result<CountryRecord, AtlasError> {
    let cells = select_all(document, markers::INDICATOR_CELL);

    if cells.len() != keys.len() {
        return Err(AtlasError::Alignment {
            country: country_name.to_string(),
            keys: keys.len(),
            cells: cells.len(),
        });
    }

    let mut record = CountryRecord::new(country_name);
    for (key, cell) in keys.iter().zip(cells) {
        record.push_indicator(key.clone(), read_cell(cell));
    }

    Ok(record)
}

/// Reads one value cell
///
/// Cells marked empty, and cells missing the value wrapper, have no value.
fn read_cell(cell: ElementRef<'_>) -> Option<MetadataValue> {
    if first_within(cell, markers::EMPTY_CELL).is_some() {
        return None;
    }

    let wrapper = first_within(cell, markers::CELL_WRAPPER)?;
    let value = first_within(wrapper, markers::CELL_VALUE).map(element_text)?;
    let year = first_within(wrapper, markers::CELL_YEAR)
        .map(element_text)
        .unwrap_or_default();

    Some(MetadataValue::from_cell(&value, &year))
}

/// Fetches and extracts one country's detail page
///
/// # Returns
///
/// * `Ok(Some(record))` - The page was fetched and aligned with the keys
/// * `Ok(None)` - The page could not be fetched; the country has no record
/// * `Err(AtlasError::Alignment)` - The page's cells do not match the keys
pub async fn fetch_country_detail(
    fetcher: &Fetcher,
    country: &CountryLink,
    keys: &[IndicatorKey],
) -> Result<Option<CountryRecord>, AtlasError> {
    let Some(document) = fetcher.fetch_document(&country.path).await else {
        return Ok(None);
    };

    extract_country_detail(&document, &country.name, keys).map(Some)
}
