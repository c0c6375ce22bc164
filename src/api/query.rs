//! The country list query

use crate::storage::{RecordFilter, Storage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Largest page a single query may request
pub const MAX_LIMIT: i64 = 100;

/// Page size when none is given
pub const DEFAULT_LIMIT: i64 = 10;

/// Query parameters that fail validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("skip must be greater than or equal to 0, got {0}")]
    Skip(i64),

    #[error("limit must be between 1 and 100, got {got}")]
    Limit { got: i64 },
}

/// Filters and pagination for listing stored countries
///
/// Filters are exact matches; an empty string counts as no filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CountryQuery {
    pub country_name: Option<String>,
    pub income_levels: Option<String>,
    pub region: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

impl Default for CountryQuery {
    fn default() -> Self {
        Self {
            country_name: None,
            income_levels: None,
            region: None,
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl CountryQuery {
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.skip < 0 {
            return Err(QueryError::Skip(self.skip));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(QueryError::Limit { got: self.limit });
        }
        Ok(())
    }

    /// The non-empty filters as storage conditions
    pub fn filters(&self) -> Vec<RecordFilter> {
        [
            ("country_name", &self.country_name),
            ("income_levels", &self.income_levels),
            ("region", &self.region),
        ]
        .into_iter()
        .filter_map(|(field, value)| match value.as_deref() {
            Some(v) if !v.is_empty() => Some(RecordFilter::new(field, v)),
            _ => None,
        })
        .collect()
    }
}

/// What the read boundary hands back: the matching documents, or an error
/// payload when the query could not be executed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Records(Vec<Value>),
    Error { error: String },
}

/// Lists stored country documents matching `query`
///
/// Invalid parameters are rejected with a [`QueryError`]. Faults while
/// executing a valid query are not propagated; they come back as
/// [`QueryResponse::Error`].
pub fn list_countries(
    storage: &dyn Storage,
    query: &CountryQuery,
) -> Result<QueryResponse, QueryError> {
    query.validate()?;

    let filters = query.filters();
    tracing::debug!(
        "Listing countries: {} filters, skip {}, limit {}",
        filters.len(),
        query.skip,
        query.limit
    );

    match storage.query_records(&filters, query.skip as u64, query.limit as u64) {
        Ok(documents) => Ok(QueryResponse::Records(documents)),
        Err(e) => {
            tracing::error!("Country query failed: {}", e);
            Ok(QueryResponse::Error {
                error: e.to_string(),
            })
        }
    }
}
