//! Read access to the stored country documents
//!
//! The query validates its bounds up front; execution faults are folded
//! into an error payload so callers always get a response body.

mod query;

pub use query::{
    list_countries, CountryQuery, QueryError, QueryResponse, DEFAULT_LIMIT, MAX_LIMIT,
};
