//! Structural queries over parsed pages
//!
//! The page markers below are the fixed contract with the source site. A
//! marker that stops matching produces empty results, never an error.

use scraper::{ElementRef, Html, Selector};

/// CSS selectors for the markers the extractors rely on
pub mod markers {
    /// Indicator headline on a detail page (one per indicator, in order)
    pub const INDICATOR_HEADLINE: &str = ".indicator-item__headline-mobile";
    /// Value cell on a detail page (one per indicator, in order)
    pub const INDICATOR_CELL: &str = "div.indicator-item__col.indicator-item__col--middle";
    /// Present inside a cell that has no data for the country
    pub const EMPTY_CELL: &str = "p.indicator-item__data-info-empty";
    pub const CELL_WRAPPER: &str = "div.indicator-item__data-inner-col-wrapper";
    pub const CELL_VALUE: &str = "div.indicator-item__data-info span";
    pub const CELL_YEAR: &str = "p.indicator-item__data-info-year";
    /// Navigation section of the country listing page
    pub const NAV_SECTION: &str = "section.nav-item";
    pub const CATEGORY_VALUE: &str = "li.overview-list-item";
    pub const MEMBER_ARTICLE: &str = "article.details.card";
    pub const MEMBER_LABEL: &str = "li.label";
}

/// Parses a CSS selector, logging instead of failing on a bad one
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::error!("Invalid selector '{}': {:?}", css, e);
            None
        }
    }
}

/// All elements of the document matching `css`, in document order
pub fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    let Some(selector) = selector(css) else {
        return Vec::new();
    };
    let found: Vec<ElementRef<'a>> = document.select(&selector).collect();
    found
}

/// All descendants of `element` matching `css`, in document order
pub fn select_within<'a>(element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    let Some(selector) = selector(css) else {
        return Vec::new();
    };
    let found: Vec<ElementRef<'a>> = element.select(&selector).collect();
    found
}

/// First descendant of `element` matching `css`
pub fn first_within<'a>(element: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = selector(css)?;
    let found = element.select(&selector).next();
    found
}

/// Concatenated text of an element, trimmed
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
