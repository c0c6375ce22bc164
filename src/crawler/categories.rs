//! Category metadata crawl
//!
//! For each dimension (e.g. "Region") the listing page names a set of
//! category values, each linking to a page that lists its member countries.
//! Dimensions are crawled concurrently, and within a dimension every value
//! page is fetched concurrently; the shared fetch gate bounds the total.

use crate::config::CategoryEntry;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{element_text, first_within, markers, select_all, select_within};
use crate::record::{CategoryIndex, CategoryLink, CategoryMembers, DimensionIndex};
use futures::future::join_all;
use scraper::{ElementRef, Html};
use std::collections::BTreeSet;

/// Finds the category values listed under the `h3` heading `header`
///
/// The values are the `li.overview-list-item` entries of the first `ol`
/// inside the heading's enclosing `li`. Returns `None` when the heading or
/// its list is missing.
pub fn extract_category_links(document: &Html, header: &str) -> Option<Vec<CategoryLink>> {
    let heading = select_all(document, "h3")
        .into_iter()
        .find(|h| element_text(*h) == header)?;

    let item = heading
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "li")?;

    let list = first_within(item, "ol")?;

    let links = select_within(list, markers::CATEGORY_VALUE)
        .into_iter()
        .filter_map(|entry| {
            let anchor = first_within(entry, "a[href]")?;
            let path = anchor.value().attr("href")?;
            Some(CategoryLink {
                name: element_text(anchor),
                path: path.trim().to_string(),
            })
        })
        .collect();

    Some(links)
}

/// Extracts the member country names from a category value page
pub fn extract_category_members(document: &Html) -> BTreeSet<String> {
    let Some(article) = select_all(document, markers::MEMBER_ARTICLE).into_iter().next() else {
        return BTreeSet::new();
    };

    select_within(article, markers::MEMBER_LABEL)
        .into_iter()
        .map(element_text)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Fetches one category value's member listing
///
/// A failed fetch yields an empty member set.
pub async fn crawl_category_value(fetcher: &Fetcher, link: &CategoryLink) -> CategoryMembers {
    let members = match fetcher.fetch_document(&link.path).await {
        Some(document) => extract_category_members(&document),
        None => BTreeSet::new(),
    };

    tracing::debug!("{}: {} member countries", link.name, members.len());

    CategoryMembers {
        label: link.name.clone(),
        members,
    }
}

/// Crawls one dimension: locates its values, then fetches every value page
///
/// The returned index holds one entry per value found, in listing order,
/// whether or not its page could be fetched.
pub async fn crawl_dimension(
    fetcher: &Fetcher,
    listing_path: &str,
    entry: &CategoryEntry,
) -> DimensionIndex {
    let mut dimension = DimensionIndex::new(entry.field_name(), entry.label.clone());

    let links = match fetcher.fetch_document(listing_path).await {
        Some(document) => extract_category_links(&document, &entry.label),
        None => None,
    };

    let Some(links) = links else {
        tracing::warn!(
            "No '{}' category list found on {}; the dimension stays empty",
            entry.label,
            listing_path
        );
        return dimension;
    };

    tracing::info!("Crawling {} '{}' categories", links.len(), entry.label);

    dimension.values = join_all(links.iter().map(|link| crawl_category_value(fetcher, link))).await;
    dimension
}

/// Crawls every configured dimension concurrently
pub async fn crawl_categories(
    fetcher: &Fetcher,
    listing_path: &str,
    entries: &[CategoryEntry],
) -> CategoryIndex {
    let dimensions =
        join_all(entries.iter().map(|entry| crawl_dimension(fetcher, listing_path, entry))).await;
    CategoryIndex::new(dimensions)
}
