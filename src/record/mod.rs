//! In-memory records produced by a crawl run
//!
//! # Components
//!
//! - `IndicatorKey`: normalized field name of one indicator
//! - `MetadataValue`: a (value, year) pair read from one indicator cell
//! - `CountryRecord`: one country's indicators plus its resolved category labels
//! - `CategoryIndex`: per dimension, the member countries of every category value

mod category;
mod country;

pub use category::{CategoryIndex, CategoryLink, CategoryMembers, DimensionIndex};
pub use country::{CountryLink, COUNTRY_NAME_FIELD, CountryRecord, IndicatorKey, MetadataValue};
